//! BSDF evaluation and directional sampling.
//!
//! A `Bsdf` is instantiated at one intersection and lives for one path
//! vertex. It works in the shading frame (surface normal = local z), so
//! cos(theta) of a direction is its local z component; the public API
//! speaks world-space directions.

use std::f32::consts::PI;

use glint_core::Color;
use glint_math::{Frame, Vec2, Vec3};

/// A sampling density, with a distinct representation for delta
/// (specular) distributions which have no meaningful density value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pdf {
    /// A delta distribution; the sentinel density is zero.
    Delta,
    Density(f32),
}

impl Pdf {
    #[inline]
    pub fn is_delta(&self) -> bool {
        matches!(self, Pdf::Delta)
    }

    /// Density for MIS weight arithmetic; delta reports the zero
    /// sentinel.
    #[inline]
    pub fn density(&self) -> f32 {
        match self {
            Pdf::Delta => 0.0,
            Pdf::Density(d) => *d,
        }
    }

    /// Divisor for throughput updates: delta samples carry their inverse
    /// density folded into `f`, so they divide by one.
    #[inline]
    pub fn weight_divisor(&self) -> f32 {
        match self {
            Pdf::Delta => 1.0,
            Pdf::Density(d) => *d,
        }
    }
}

/// The lobe class a sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceClass {
    Diffuse,
    Glossy,
    Specular,
}

/// A directional sample drawn from a BSDF.
#[derive(Debug, Clone, Copy)]
pub struct BsdfSample {
    /// World-space unit direction away from the surface.
    pub dir: Vec3,
    /// BSDF value along `dir` (for delta lobes, pre-divided by the
    /// lobe-selection probability).
    pub f: Color,
    pub pdf: Pdf,
    pub class: SurfaceClass,
    /// True if the sample passes through the surface.
    pub transmissive: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum BsdfKind {
    Lambert {
        albedo: Color,
    },
    Mirror {
        reflectance: Color,
        diffuse: Color,
        ior: f32,
    },
    Glass {
        /// n_incoming / n_transmitted across the interface.
        eta: f32,
    },
    Phong {
        reflectance: Color,
        exponent: f32,
    },
}

pub struct Bsdf {
    frame: Frame,
    /// Local-space unit direction toward the viewer (z > 0).
    viewer: Vec3,
    kind: BsdfKind,
}

impl Bsdf {
    pub(crate) fn new(frame: Frame, viewer: Vec3, kind: BsdfKind) -> Self {
        Self {
            frame,
            viewer,
            kind,
        }
    }

    /// The world-space shading normal.
    pub fn normal(&self) -> Vec3 {
        self.frame.z
    }

    /// Evaluate the BSDF toward world direction `dir`, returning the
    /// reflectance value and the density `sample` would have for that
    /// direction. Specular-only BSDFs evaluate to zero.
    pub fn eval(&self, dir: Vec3) -> (Color, f32) {
        let w = self.frame.to_local(dir.normalize());
        if w.z <= 0.0 {
            return (Color::BLACK, 0.0);
        }

        match &self.kind {
            BsdfKind::Lambert { albedo } => (*albedo / PI, w.z / PI),
            BsdfKind::Mirror {
                diffuse, ior, ..
            } => {
                if diffuse.is_black() {
                    return (Color::BLACK, 0.0);
                }
                let f_spec = self.mirror_fresnel(*ior);
                let q = f_spec;
                (*diffuse * (1.0 - f_spec) / PI, (1.0 - q) * w.z / PI)
            }
            BsdfKind::Glass { .. } => (Color::BLACK, 0.0),
            BsdfKind::Phong {
                reflectance,
                exponent,
            } => {
                let mirror = self.mirror_dir();
                let cos_a = w.dot(mirror).max(0.0);
                let lobe = cos_a.powf(*exponent);
                (
                    *reflectance * ((exponent + 2.0) / (2.0 * PI)) * lobe,
                    (exponent + 1.0) / (2.0 * PI) * lobe,
                )
            }
        }
    }

    /// Draw a directional sample from uniform parameters `u`.
    ///
    /// Returns None for a zero-weight sample (e.g. a non-transmissive
    /// lobe landing below the horizon); callers terminate or skip.
    pub fn sample(&self, u: Vec2) -> Option<BsdfSample> {
        if self.viewer.z <= 0.0 {
            return None;
        }

        let local = match &self.kind {
            BsdfKind::Lambert { albedo } => {
                let dir = cosine_hemisphere(u);
                LocalSample {
                    dir,
                    f: *albedo / PI,
                    pdf: Pdf::Density(dir.z / PI),
                    class: SurfaceClass::Diffuse,
                    transmissive: false,
                }
            }
            BsdfKind::Mirror {
                reflectance,
                diffuse,
                ior,
            } => self.sample_mirror(u, *reflectance, *diffuse, *ior)?,
            BsdfKind::Glass { eta } => self.sample_glass(u, *eta),
            BsdfKind::Phong {
                reflectance,
                exponent,
            } => self.sample_phong(u, *reflectance, *exponent)?,
        };

        if local.f.is_black() {
            return None;
        }
        Some(BsdfSample {
            dir: self.frame.to_world(local.dir),
            f: local.f,
            pdf: local.pdf,
            class: local.class,
            transmissive: local.transmissive,
        })
    }

    /// Local mirror reflection of the viewer direction.
    fn mirror_dir(&self) -> Vec3 {
        Vec3::new(-self.viewer.x, -self.viewer.y, self.viewer.z)
    }

    /// Fresnel reflectance of the specular coat (1 when disabled).
    fn mirror_fresnel(&self, ior: f32) -> f32 {
        if ior > 0.0 {
            fresnel_dielectric(self.viewer.z, 1.0 / ior)
        } else {
            1.0
        }
    }

    fn sample_mirror(
        &self,
        u: Vec2,
        reflectance: Color,
        diffuse: Color,
        ior: f32,
    ) -> Option<LocalSample> {
        let f_spec = self.mirror_fresnel(ior);
        let q = if diffuse.is_black() { 1.0 } else { f_spec };

        if u.x < q {
            // Specular coat; the selection probability folds into f.
            Some(LocalSample {
                dir: self.mirror_dir(),
                f: reflectance * (f_spec / q) / self.viewer.z,
                pdf: Pdf::Delta,
                class: SurfaceClass::Specular,
                transmissive: false,
            })
        } else {
            let u = Vec2::new((u.x - q) / (1.0 - q), u.y);
            let dir = cosine_hemisphere(u);
            Some(LocalSample {
                dir,
                f: diffuse * (1.0 - f_spec) / PI,
                pdf: Pdf::Density((1.0 - q) * dir.z / PI),
                class: SurfaceClass::Diffuse,
                transmissive: false,
            })
        }
    }

    fn sample_glass(&self, u: Vec2, eta: f32) -> LocalSample {
        let cos_i = self.viewer.z.min(1.0);
        let sin2_t = eta * eta * (1.0 - cos_i * cos_i);

        // Total internal reflection.
        if sin2_t >= 1.0 {
            return LocalSample {
                dir: self.mirror_dir(),
                f: Color::WHITE / cos_i,
                pdf: Pdf::Delta,
                class: SurfaceClass::Specular,
                transmissive: false,
            };
        }

        let cos_t = (1.0 - sin2_t).sqrt();
        let fr = fresnel_dielectric(cos_i, eta);

        if u.x < fr {
            LocalSample {
                dir: self.mirror_dir(),
                f: Color::WHITE / cos_i,
                pdf: Pdf::Delta,
                class: SurfaceClass::Specular,
                transmissive: false,
            }
        } else {
            // Snell refraction; eta^2 accounts for radiance compression
            // across the interface.
            let dir = Vec3::new(-self.viewer.x * eta, -self.viewer.y * eta, -cos_t);
            LocalSample {
                dir,
                f: Color::WHITE * (eta * eta) / cos_t,
                pdf: Pdf::Delta,
                class: SurfaceClass::Specular,
                transmissive: true,
            }
        }
    }

    fn sample_phong(&self, u: Vec2, reflectance: Color, exponent: f32) -> Option<LocalSample> {
        let mirror = self.mirror_dir();
        let cos_a = u.x.powf(1.0 / (exponent + 1.0));
        let sin_a = (1.0 - cos_a * cos_a).max(0.0).sqrt();
        let phi = 2.0 * PI * u.y;

        let lobe_frame = Frame::from_normal(Vec3::ZERO, mirror);
        let dir = lobe_frame.to_world(Vec3::new(
            sin_a * phi.cos(),
            sin_a * phi.sin(),
            cos_a,
        ));

        // Below the horizon: zero-weight sample.
        if dir.z <= 0.0 {
            return None;
        }

        let lobe = cos_a.powf(exponent);
        Some(LocalSample {
            dir,
            f: reflectance * ((exponent + 2.0) / (2.0 * PI)) * lobe,
            pdf: Pdf::Density((exponent + 1.0) / (2.0 * PI) * lobe),
            class: SurfaceClass::Glossy,
            transmissive: false,
        })
    }

    #[cfg(test)]
    pub(crate) fn glass_eta(&self) -> Option<f32> {
        match self.kind {
            BsdfKind::Glass { eta } => Some(eta),
            _ => None,
        }
    }
}

struct LocalSample {
    dir: Vec3,
    f: Color,
    pdf: Pdf,
    class: SurfaceClass,
    transmissive: bool,
}

/// Cosine-weighted hemisphere sample around local +z; pdf = cos/pi.
fn cosine_hemisphere(u: Vec2) -> Vec3 {
    let r = u.x.sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(
        r * phi.cos(),
        r * phi.sin(),
        (1.0 - u.x).max(0.0).sqrt().max(1e-6),
    )
}

/// Unpolarized Fresnel reflectance of a dielectric interface.
///
/// `eta` is the ratio n_incoming / n_transmitted.
pub(crate) fn fresnel_dielectric(cos_i: f32, eta: f32) -> f32 {
    let cos_i = cos_i.clamp(0.0, 1.0);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin2_t).sqrt();

    let r_perp = (eta * cos_i - cos_t) / (eta * cos_i + cos_t);
    let r_parl = (cos_i - eta * cos_t) / (cos_i + eta * cos_t);
    0.5 * (r_perp * r_perp + r_parl * r_parl)
}
