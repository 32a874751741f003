//! Direct-illumination estimation by multiple importance sampling.
//!
//! At a non-specular shading point, two strategies estimate the same
//! integral: sampling each light (then evaluating the BSDF toward it),
//! and sampling the BSDF (then seeing which light the ray reaches).
//! Their contributions are combined with the power heuristic; delta
//! distributions on either side take full weight.

use glint_core::Color;
use glint_math::{Ray, Vec2};
use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::bsdf::{Bsdf, Pdf};
use crate::context::{RenderOptions, RenderStats};
use crate::light::Light;
use crate::octree::{Occlusion, ShadowOrigin};
use crate::sampler::{Channel1d, Channel2d, SampleLayout, SampleSet};
use crate::scene::Scene;
use crate::surface::Hit;

/// Shadow rays stop just short of the sampled light point, so the
/// light's own geometry never occludes it.
const LIGHT_CLEARANCE: f32 = 1.0 - 1e-3;

#[derive(Debug, Clone, Copy)]
struct Channels {
    select: Channel1d,
    light_uv: Channel2d,
    bsdf_uv: Channel2d,
}

/// One direct-lighting estimator instance, with its stratified channel
/// reservation (or none, for ad-hoc use deep in a path).
pub struct DirectIllum {
    num_samples: u32,
    channels: Option<Channels>,
}

impl DirectIllum {
    /// An estimator drawing `num_samples` stratified samples per call
    /// from channels registered in `layout`.
    pub fn new(layout: &mut SampleLayout, num_samples: u32) -> Self {
        let num_samples = num_samples.max(1);
        Self {
            num_samples,
            channels: Some(Channels {
                select: layout.add_channel_1d(num_samples),
                light_uv: layout.add_channel_2d(num_samples),
                bsdf_uv: layout.add_channel_2d(num_samples),
            }),
        }
    }

    /// An estimator with no stratified budget; parameters come from the
    /// caller's uniform generator.
    pub fn adhoc(num_samples: u32) -> Self {
        Self {
            num_samples: num_samples.max(1),
            channels: None,
        }
    }

    /// Estimate direct lighting at `hit` using the pixel's stratified
    /// samples for camera sample `s`.
    #[allow(clippy::too_many_arguments)]
    pub fn sample_lights(
        &self,
        scene: &Scene,
        hit: &Hit,
        bsdf: &Bsdf,
        samples: &SampleSet,
        s: u32,
        options: &RenderOptions,
        stats: &mut RenderStats,
    ) -> Color {
        let ch = self.channels.expect("estimator has no channels");
        let mut total = Color::BLACK;
        for i in 0..self.num_samples {
            total += estimate(
                scene,
                hit,
                bsdf,
                samples.get_1d(ch.select, s, i),
                samples.get_2d(ch.light_uv, s, i),
                samples.get_2d(ch.bsdf_uv, s, i),
                options,
                stats,
            );
        }
        total / self.num_samples as f32
    }

    /// Estimate direct lighting with parameters drawn from `rng`, for
    /// path vertices past the stratified budget.
    #[allow(clippy::too_many_arguments)]
    pub fn sample_lights_rng(
        &self,
        scene: &Scene,
        hit: &Hit,
        bsdf: &Bsdf,
        rng: &mut Xoshiro256PlusPlus,
        options: &RenderOptions,
        stats: &mut RenderStats,
    ) -> Color {
        let mut total = Color::BLACK;
        for _ in 0..self.num_samples {
            total += estimate(
                scene,
                hit,
                bsdf,
                rng.gen(),
                Vec2::new(rng.gen(), rng.gen()),
                Vec2::new(rng.gen(), rng.gen()),
                options,
                stats,
            );
        }
        total / self.num_samples as f32
    }
}

/// Power heuristic (beta = 2) weight for strategy `a` against `b`.
fn power_heuristic(a: f32, b: f32) -> f32 {
    let a2 = a * a;
    let denom = a2 + b * b;
    if denom > 0.0 {
        a2 / denom
    } else {
        0.0
    }
}

/// One MIS estimate: a light sample per light (or one chosen light in
/// single-light mode) plus one BSDF sample.
#[allow(clippy::too_many_arguments)]
fn estimate(
    scene: &Scene,
    hit: &Hit,
    bsdf: &Bsdf,
    u_select: f32,
    uv_light: Vec2,
    uv_bsdf: Vec2,
    options: &RenderOptions,
    stats: &mut RenderStats,
) -> Color {
    let lights = scene.lights();
    if lights.is_empty() {
        return Color::BLACK;
    }
    let origin = ShadowOrigin::from_hit(hit);

    let mut radiance = Color::BLACK;
    if options.single_light {
        let index = ((u_select * lights.len() as f32) as usize).min(lights.len() - 1);
        radiance += light_strategy(
            scene,
            hit,
            bsdf,
            &lights[index],
            uv_light,
            &origin,
            options,
            stats,
        ) * lights.len() as f32;
    } else {
        for light in lights {
            radiance +=
                light_strategy(scene, hit, bsdf, light, uv_light, &origin, options, stats);
        }
    }

    radiance + bsdf_strategy(scene, hit, bsdf, uv_bsdf, options, stats)
}

/// Sample one light, evaluate the BSDF toward it, and shadow-test.
#[allow(clippy::too_many_arguments)]
fn light_strategy(
    scene: &Scene,
    hit: &Hit,
    bsdf: &Bsdf,
    light: &Light,
    uv: Vec2,
    origin: &ShadowOrigin,
    options: &RenderOptions,
    stats: &mut RenderStats,
) -> Color {
    let Some(ls) = light.sample(hit.point, uv) else {
        return Color::BLACK;
    };
    if ls.radiance.is_black() {
        return Color::BLACK;
    }
    if let Pdf::Density(p) = ls.pdf {
        if p <= 0.0 {
            return Color::BLACK;
        }
    }

    let (f, bsdf_pdf) = bsdf.eval(ls.dir);
    if f.is_black() {
        return Color::BLACK;
    }

    let t1 = (ls.dist * LIGHT_CLEARANCE).max(options.min_trace * 2.0);
    let shadow = Ray::new(hit.point, ls.dir, options.min_trace, t1);
    let transmittance = match scene.occludes(&shadow, Some(origin), stats) {
        Occlusion::Full => return Color::BLACK,
        Occlusion::Clear(t) => t,
    };

    let cos = ls.dir.dot(bsdf.normal()).abs();
    match ls.pdf {
        // Delta lights cannot be hit by BSDF samples: full weight.
        Pdf::Delta => f * ls.radiance * transmittance * cos,
        Pdf::Density(p_l) => {
            let w = power_heuristic(p_l, bsdf_pdf);
            f * ls.radiance * transmittance * (cos * w / p_l)
        }
    }
}

/// Sample the BSDF once and look for emission along the sampled ray.
fn bsdf_strategy(
    scene: &Scene,
    hit: &Hit,
    bsdf: &Bsdf,
    uv: Vec2,
    options: &RenderOptions,
    stats: &mut RenderStats,
) -> Color {
    let Some(bs) = bsdf.sample(uv) else {
        return Color::BLACK;
    };
    // Specular samples are the integrator's business, not direct
    // lighting's.
    let Pdf::Density(p_b) = bs.pdf else {
        return Color::BLACK;
    };
    if p_b <= 0.0 {
        return Color::BLACK;
    }

    let cos = bs.dir.dot(bsdf.normal()).abs();
    let scale = bs.f * (cos / p_b);

    let mut ray = Ray::new(hit.point, bs.dir, options.min_trace, f32::INFINITY);
    match scene.intersect(&mut ray, stats) {
        Some(h2) => {
            let material = &scene.materials()[h2.material as usize];
            let emitted = material.emission(&h2);
            if emitted.is_black() {
                return Color::BLACK;
            }
            let p_l = material
                .emitter_light()
                .map(|li| scene.lights()[li as usize].eval(hit.point, bs.dir).1)
                .unwrap_or(0.0);
            scale * emitted * power_heuristic(p_b, p_l)
        }
        None => {
            // The ray escaped: environmental lights contribute.
            let mut radiance = Color::BLACK;
            for light in scene.lights() {
                if !light.is_environ() {
                    continue;
                }
                let (emitted, p_l) = light.eval(hit.point, bs.dir);
                if emitted.is_black() {
                    continue;
                }
                radiance += scale * emitted * power_heuristic(p_b, p_l);
            }
            radiance
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use glint_math::Vec3;
    use rand::SeedableRng;

    fn lambert_hit_and_bsdf(scene: &Scene) -> (Hit, Bsdf) {
        let hit = Hit {
            t: 1.0,
            point: Vec3::ZERO,
            geom_normal: Vec3::Z,
            normal: Vec3::Z,
            back: false,
            surface: 0,
            material: 0,
            smoothing_group: None,
        };
        let ray = Ray::new(Vec3::new(0.0, 0.0, 3.0), -Vec3::Z, 0.0, 3.0);
        let bsdf = scene.materials()[0]
            .bsdf(&hit, &ray, &crate::media::MediaStack::new(Default::default()))
            .unwrap();
        (hit, bsdf)
    }

    #[test]
    fn test_power_heuristic() {
        assert_eq!(power_heuristic(1.0, 0.0), 1.0);
        assert_eq!(power_heuristic(0.0, 1.0), 0.0);
        assert!((power_heuristic(1.0, 1.0) - 0.5).abs() < 1e-6);
        // Degenerate case contributes nothing rather than NaN.
        assert_eq!(power_heuristic(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_point_light_direct() {
        // Lambertian plane point under a point light, no occluders:
        // radiance = rho/pi * I/d^2 * cos.
        let mut scene = Scene::new();
        scene.add_material(Material::lambertian(Color::gray(0.8)));
        scene.add_light(Light::point(Vec3::new(0.0, 0.0, 4.0), Color::WHITE));
        scene.build_acceleration();

        let (hit, bsdf) = lambert_hit_and_bsdf(&scene);
        let options = RenderOptions::new(8, 8, 1);
        let mut stats = RenderStats::default();

        let got = estimate(
            &scene,
            &hit,
            &bsdf,
            0.5,
            Vec2::new(0.3, 0.7),
            Vec2::new(0.6, 0.2),
            &options,
            &mut stats,
        );

        let expect = 0.8 / std::f32::consts::PI * (1.0 / 16.0);
        assert!(
            (got.r - expect).abs() < 1e-5,
            "direct {got:?}, expected {expect}"
        );
    }

    #[test]
    fn test_mis_converges_to_analytic_disc() {
        // Lambertian point under a small disc light straight overhead.
        // Analytic direct lighting for a disc of radius r at height h:
        // L * rho * r^2 / (r^2 + h^2).
        let (r, h) = (0.5f32, 2.0f32);
        let mut scene = Scene::new();
        scene.add_material(Material::lambertian(Color::gray(0.6)));
        scene.add_area_light(Vec3::new(0.0, 0.0, h), -Vec3::Z, r, Color::WHITE);
        scene.build_acceleration();

        let (hit, bsdf) = lambert_hit_and_bsdf(&scene);
        let options = RenderOptions::new(8, 8, 1);
        let mut stats = RenderStats::default();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(12);

        let n = 20_000;
        let mut total = 0.0;
        for _ in 0..n {
            let c = estimate(
                &scene,
                &hit,
                &bsdf,
                rng.gen(),
                Vec2::new(rng.gen(), rng.gen()),
                Vec2::new(rng.gen(), rng.gen()),
                &options,
                &mut stats,
            );
            total += c.r;
        }
        let mean = total / n as f32;
        let expect = 0.6 * r * r / (r * r + h * h);
        assert!(
            (mean - expect).abs() / expect < 0.03,
            "MIS mean {mean}, analytic {expect}"
        );
    }

    #[test]
    fn test_occluded_light_contributes_nothing() {
        let mut scene = Scene::new();
        scene.add_material(Material::lambertian(Color::gray(0.8)));
        let blocker = scene.add_material(Material::lambertian(Color::gray(0.5)));
        // Opaque disc between the shading point and the light.
        scene.add_disc(Vec3::new(0.0, 0.0, 2.0), Vec3::Z, 5.0, blocker);
        scene.add_light(Light::point(Vec3::new(0.0, 0.0, 4.0), Color::WHITE));
        scene.build_acceleration();

        let (hit, bsdf) = lambert_hit_and_bsdf(&scene);
        let options = RenderOptions::new(8, 8, 1);
        let mut stats = RenderStats::default();

        let got = estimate(
            &scene,
            &hit,
            &bsdf,
            0.5,
            Vec2::new(0.3, 0.7),
            Vec2::new(0.6, 0.2),
            &options,
            &mut stats,
        );
        assert!(got.is_black(), "occluded estimate {got:?}");
    }

    #[test]
    fn test_single_light_mode_unbiased() {
        // Two identical point lights; single-light mode must average to
        // the same total as enumerating both.
        let mut scene = Scene::new();
        scene.add_material(Material::lambertian(Color::gray(0.8)));
        scene.add_light(Light::point(Vec3::new(1.0, 0.0, 4.0), Color::WHITE));
        scene.add_light(Light::point(Vec3::new(-1.0, 0.0, 4.0), Color::WHITE));
        scene.build_acceleration();

        let (hit, bsdf) = lambert_hit_and_bsdf(&scene);
        let mut stats = RenderStats::default();

        let all = RenderOptions::new(8, 8, 1);
        let full = estimate(
            &scene,
            &hit,
            &bsdf,
            0.5,
            Vec2::new(0.3, 0.7),
            Vec2::new(0.6, 0.2),
            &all,
            &mut stats,
        );

        let mut single = RenderOptions::new(8, 8, 1);
        single.single_light = true;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let n = 8000;
        let mut total = Color::BLACK;
        for _ in 0..n {
            total += estimate(
                &scene,
                &hit,
                &bsdf,
                rng.gen(),
                Vec2::new(0.3, 0.7),
                Vec2::new(0.6, 0.2),
                &single,
                &mut stats,
            );
        }
        let mean = total / n as f32;
        assert!((mean.r - full.r).abs() / full.r < 0.03);
    }
}
