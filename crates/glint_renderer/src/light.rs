//! Light sources: point, far (directional with angular extent), disc
//! area, and environment lights.

use std::f32::consts::PI;
use std::sync::Arc;

use glint_core::{Color, Envmap};
use glint_math::{Frame, Vec2, Vec3};

use crate::bsdf::Pdf;
use crate::dist::Distribution2D;

/// A directional light sample taken from a shading point.
#[derive(Debug, Clone, Copy)]
pub struct LightSample {
    /// World-space unit direction from the shading point to the light.
    pub dir: Vec3,
    /// Radiance arriving along `dir`.
    pub radiance: Color,
    /// Solid-angle density of the sample; delta for point lights.
    pub pdf: Pdf,
    /// Distance to the light (or to its virtual far point).
    pub dist: f32,
}

#[derive(Debug, Clone)]
pub enum Light {
    /// Isotropic point source; `intensity` per steradian.
    Point { pos: Vec3, intensity: Color },
    /// Light at infinite distance subtending a cone of half-angle
    /// `half_angle` around `dir`.
    Far {
        dir: Vec3,
        half_angle: f32,
        intensity: Color,
        min_cos: f32,
        scene_radius: f32,
    },
    /// Disc area light emitting `radiance` from its front side.
    Area {
        center: Vec3,
        normal: Vec3,
        radius: f32,
        radiance: Color,
    },
    /// Environment light importance-sampled from a lat-long map.
    Environ {
        map: Arc<Envmap>,
        dist: Distribution2D,
        scene_radius: f32,
    },
}

impl Light {
    pub fn point(pos: Vec3, intensity: Color) -> Self {
        Light::Point { pos, intensity }
    }

    pub fn far(dir: Vec3, half_angle: f32, intensity: Color) -> Self {
        Light::Far {
            dir: dir.normalize(),
            half_angle,
            intensity,
            min_cos: half_angle.cos(),
            scene_radius: 0.0,
        }
    }

    pub fn area(center: Vec3, normal: Vec3, radius: f32, radiance: Color) -> Self {
        Light::Area {
            center,
            normal: normal.normalize(),
            radius,
            radiance,
        }
    }

    /// Build an environment light from a map, importance-sampled by a 2D
    /// piecewise-constant distribution over the map's luminance,
    /// pre-integrated per pixel row.
    pub fn environ(map: Arc<Envmap>) -> Self {
        let height = map.height();
        let rows: Vec<Vec<f32>> = (0..height)
            .map(|y| {
                // Rows near the poles cover less solid angle.
                let theta = (y as f32 + 0.5) / height as f32 * PI;
                let sin_theta = theta.sin();
                map.row(y)
                    .iter()
                    .map(|c| c.luminance() * sin_theta)
                    .collect()
            })
            .collect();

        Light::Environ {
            map,
            dist: Distribution2D::new(&rows),
            scene_radius: 0.0,
        }
    }

    /// True for lights not associated with any scene surface, which
    /// contribute when a ray escapes the scene.
    pub fn is_environ(&self) -> bool {
        matches!(self, Light::Far { .. } | Light::Environ { .. })
    }

    /// Scene-related setup, called once after the acceleration structure
    /// is built, with the scene's bounding sphere.
    ///
    /// Environmental lights use the radius to place virtual hit points
    /// far enough out to clear the scene.
    pub fn scene_setup(&mut self, _center: Vec3, radius: f32) {
        match self {
            Light::Far { scene_radius, .. } | Light::Environ { scene_radius, .. } => {
                *scene_radius = radius;
            }
            _ => {}
        }
    }

    /// Distance used for shadow rays toward an environmental light.
    fn far_dist(scene_radius: f32) -> f32 {
        (scene_radius * 2.0).max(1.0)
    }

    /// Sample this light from `point`; None if the light cannot be seen
    /// from there (e.g. behind an area light).
    pub fn sample(&self, point: Vec3, uv: Vec2) -> Option<LightSample> {
        match self {
            Light::Point { pos, intensity } => {
                let to_light = *pos - point;
                let dist2 = to_light.length_squared();
                if dist2 == 0.0 {
                    return None;
                }
                let dist = dist2.sqrt();
                Some(LightSample {
                    dir: to_light / dist,
                    radiance: *intensity / dist2,
                    pdf: Pdf::Delta,
                    dist,
                })
            }

            Light::Far {
                dir,
                intensity,
                min_cos,
                scene_radius,
                ..
            } => {
                // Uniform over the cone's solid angle.
                let cos_theta = 1.0 - uv.x * (1.0 - min_cos);
                let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
                let phi = 2.0 * PI * uv.y;
                let frame = Frame::from_normal(Vec3::ZERO, *dir);
                let sample_dir = frame.to_world(Vec3::new(
                    sin_theta * phi.cos(),
                    sin_theta * phi.sin(),
                    cos_theta,
                ));
                Some(LightSample {
                    dir: sample_dir,
                    radiance: *intensity,
                    pdf: Pdf::Density(cone_pdf(*min_cos)),
                    dist: Self::far_dist(*scene_radius),
                })
            }

            Light::Area {
                center,
                normal,
                radius,
                radiance,
            } => {
                // Uniform by area over the disc, converted to the
                // solid-angle measure at the shading point.
                let r = radius * uv.x.sqrt();
                let phi = 2.0 * PI * uv.y;
                let frame = Frame::from_normal(*center, *normal);
                let p = frame.point_to_world(Vec3::new(r * phi.cos(), r * phi.sin(), 0.0));

                let to_light = p - point;
                let dist2 = to_light.length_squared();
                if dist2 == 0.0 {
                    return None;
                }
                let dist = dist2.sqrt();
                let dir = to_light / dist;

                let cos_light = (-dir).dot(*normal);
                if cos_light <= 0.0 {
                    return None;
                }

                let area = PI * radius * radius;
                Some(LightSample {
                    dir,
                    radiance: *radiance,
                    pdf: Pdf::Density(dist2 / (area * cos_light)),
                    dist,
                })
            }

            Light::Environ {
                map,
                dist,
                scene_radius,
            } => {
                let (p, map_pdf) = dist.sample(uv);
                let theta = p.y * PI;
                let sin_theta = theta.sin();
                if sin_theta <= 0.0 || map_pdf <= 0.0 {
                    return None;
                }
                let dir = Envmap::uv_to_dir(p);
                Some(LightSample {
                    dir,
                    radiance: map.radiance(dir),
                    pdf: Pdf::Density(map_pdf / (sin_theta * 2.0 * PI * PI)),
                    dist: Self::far_dist(*scene_radius),
                })
            }
        }
    }

    /// Evaluate this light's radiance and sampling density toward unit
    /// direction `dir` from `point`.
    pub fn eval(&self, point: Vec3, dir: Vec3) -> (Color, f32) {
        match self {
            Light::Point { .. } => (Color::BLACK, 0.0),

            Light::Far {
                dir: light_dir,
                intensity,
                min_cos,
                ..
            } => {
                if dir.dot(*light_dir) >= *min_cos {
                    (*intensity, cone_pdf(*min_cos))
                } else {
                    (Color::BLACK, 0.0)
                }
            }

            Light::Area {
                center,
                normal,
                radius,
                radiance,
            } => {
                let denom = dir.dot(*normal);
                if denom >= 0.0 {
                    // Behind or edge-on.
                    return (Color::BLACK, 0.0);
                }
                let t = (*center - point).dot(*normal) / denom;
                if t <= 0.0 {
                    return (Color::BLACK, 0.0);
                }
                let p = point + dir * t;
                if (p - *center).length_squared() > radius * radius {
                    return (Color::BLACK, 0.0);
                }
                let area = PI * radius * radius;
                let cos_light = -denom;
                (*radiance, (t * t) / (area * cos_light))
            }

            Light::Environ { map, dist, .. } => {
                let uv = Envmap::dir_to_uv(dir);
                let sin_theta = (uv.y * PI).sin();
                if sin_theta <= 0.0 {
                    return (Color::BLACK, 0.0);
                }
                let pdf = dist.pdf(uv) / (sin_theta * 2.0 * PI * PI);
                (map.radiance(dir), pdf)
            }
        }
    }

    /// Radiance this light contributes to a ray that escapes the scene.
    pub fn environ_radiance(&self, dir: Vec3) -> Color {
        match self {
            Light::Far {
                dir: light_dir,
                intensity,
                min_cos,
                ..
            } if dir.dot(*light_dir) >= *min_cos => *intensity,
            Light::Environ { map, .. } => map.radiance(dir),
            _ => Color::BLACK,
        }
    }
}

/// Uniform density over a cone: 1 / (2 pi (1 - cos(half-angle))).
fn cone_pdf(min_cos: f32) -> f32 {
    1.0 / (2.0 * PI * (1.0 - min_cos)).max(f32::MIN_POSITIVE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_point_light_inverse_square() {
        let light = Light::point(Vec3::new(0.0, 0.0, 4.0), Color::WHITE);
        let s = light.sample(Vec3::ZERO, Vec2::ZERO).unwrap();

        assert!(s.pdf.is_delta());
        assert!((s.dist - 4.0).abs() < 1e-5);
        assert!((s.radiance.r - 1.0 / 16.0).abs() < 1e-5);
        assert!((s.dir - Vec3::Z).length() < 1e-5);
        // Point lights cannot be evaluated.
        assert_eq!(light.eval(Vec3::ZERO, Vec3::Z), (Color::BLACK, 0.0));
    }

    #[test]
    fn test_far_light_cone() {
        let half_angle = 0.2f32;
        let mut light = Light::far(Vec3::Y, half_angle, Color::gray(2.0));
        light.scene_setup(Vec3::ZERO, 10.0);

        let mut rng = StdRng::seed_from_u64(5);
        let expect_pdf = 1.0 / (2.0 * PI * (1.0 - half_angle.cos()));
        for _ in 0..200 {
            let s = light
                .sample(Vec3::ZERO, Vec2::new(rng.gen(), rng.gen()))
                .unwrap();
            // Every sample is inside the cone.
            assert!(s.dir.dot(Vec3::Y) >= half_angle.cos() - 1e-4);
            assert!((s.pdf.density() - expect_pdf).abs() / expect_pdf < 1e-4);
            // eval agrees for directions in the cone.
            let (radiance, pdf) = light.eval(Vec3::ZERO, s.dir);
            assert_eq!(radiance, Color::gray(2.0));
            assert!((pdf - expect_pdf).abs() / expect_pdf < 1e-4);
        }

        // Directions outside the cone evaluate to zero.
        let (radiance, pdf) = light.eval(Vec3::ZERO, Vec3::X);
        assert!(radiance.is_black());
        assert_eq!(pdf, 0.0);
    }

    #[test]
    fn test_area_light_pdf_matches_eval() {
        let light = Light::area(Vec3::new(0.0, 3.0, 0.0), -Vec3::Y, 0.5, Color::WHITE);
        let point = Vec3::new(0.2, 0.0, -0.1);
        let mut rng = StdRng::seed_from_u64(6);

        for _ in 0..200 {
            let s = light
                .sample(point, Vec2::new(rng.gen(), rng.gen()))
                .unwrap();
            let (radiance, pdf) = light.eval(point, s.dir);
            assert_eq!(radiance, Color::WHITE);
            let d = s.pdf.density();
            assert!((pdf - d).abs() / d < 1e-3, "{pdf} vs {d}");
        }

        // From behind, the light is invisible.
        let behind = Vec3::new(0.0, 6.0, 0.0);
        assert!(light.sample(behind, Vec2::new(0.5, 0.5)).is_none());
    }

    #[test]
    fn test_area_light_solid_angle_normalization() {
        // Integrating the solid-angle pdf over sampled directions gives
        // 1 on average: E[1] = 1, checked via pdf consistency with a
        // far-away small disc (approaches dist^2 / (A cos)).
        let light = Light::area(Vec3::new(0.0, 100.0, 0.0), -Vec3::Y, 0.1, Color::WHITE);
        let s = light.sample(Vec3::ZERO, Vec2::new(0.3, 0.7)).unwrap();
        let area = PI * 0.1 * 0.1;
        let expect = (100.0 * 100.0) / area;
        assert!((s.pdf.density() - expect).abs() / expect < 0.01);
    }

    #[test]
    fn test_environ_light_uniform_map() {
        let mut light = Light::environ(Arc::new(Envmap::solid(Color::gray(0.5))));
        light.scene_setup(Vec3::ZERO, 5.0);

        // For a constant map the directional pdf must integrate to 1
        // over the sphere; spot-check against the uniform value away
        // from the poles where the piecewise rows are exact.
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let s = light
                .sample(Vec3::ZERO, Vec2::new(rng.gen(), rng.gen()))
                .unwrap();
            assert_eq!(s.radiance, Color::gray(0.5));
            let (radiance, pdf) = light.eval(Vec3::ZERO, s.dir);
            assert_eq!(radiance, Color::gray(0.5));
            assert!((pdf - s.pdf.density()).abs() < 0.05 * s.pdf.density());
            assert!((s.dist - 10.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_environ_radiance_on_escape() {
        let light = Light::environ(Arc::new(Envmap::solid(Color::gray(0.25))));
        assert_eq!(light.environ_radiance(Vec3::X), Color::gray(0.25));
        assert!(light.is_environ());

        let area = Light::area(Vec3::ZERO, Vec3::Y, 1.0, Color::WHITE);
        assert!(!area.is_environ());
        assert!(area.environ_radiance(Vec3::X).is_black());
    }
}
