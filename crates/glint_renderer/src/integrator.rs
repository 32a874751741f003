//! Surface integrators: whole-path radiance estimation.

use glint_core::{Color, RenderParams, Tint};
use glint_math::{Ray, Vec2};
use rand::Rng;

use crate::bsdf::{Pdf, SurfaceClass};
use crate::context::RenderContext;
use crate::direct::DirectIllum;
use crate::sampler::{Channel2d, SampleLayout};
use crate::surface::Hit;

/// Which surface integrator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorKind {
    Direct,
    Path,
}

impl std::str::FromStr for IntegratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(IntegratorKind::Direct),
            "path" => Ok(IntegratorKind::Path),
            other => Err(format!("{other}: unknown integrator")),
        }
    }
}

pub enum Integrator {
    Direct(DirectInteg),
    Path(PathInteg),
}

impl Integrator {
    /// Build an integrator, reserving its stratified channels in
    /// `layout`.
    pub fn new(kind: IntegratorKind, params: &RenderParams, layout: &mut SampleLayout) -> Self {
        match kind {
            IntegratorKind::Direct => Integrator::Direct(DirectInteg::new(params, layout)),
            IntegratorKind::Path => Integrator::Path(PathInteg::new(params, layout)),
        }
    }

    /// Radiance (and alpha coverage) arriving at `ray`'s origin from the
    /// direction it points in, for camera sample `s`.
    pub fn li(&self, ray: Ray, ctx: &mut RenderContext, s: u32) -> Tint {
        match self {
            Integrator::Direct(integ) => integ.li(ray, ctx, s),
            Integrator::Path(integ) => integ.li(ray, ctx, s),
        }
    }
}

/// Direct lighting only, with recursion through specular surfaces.
pub struct DirectInteg {
    direct: DirectIllum,
    max_depth: u32,
}

impl DirectInteg {
    pub fn new(params: &RenderParams, layout: &mut SampleLayout) -> Self {
        Self {
            direct: DirectIllum::new(layout, params.get_uint("light-samples", 16)),
            max_depth: params.get_uint("max-depth", 6),
        }
    }

    fn li(&self, ray: Ray, ctx: &mut RenderContext, s: u32) -> Tint {
        let scene = ctx.scene;
        let mut isec_ray = ray;
        match scene.intersect(&mut isec_ray, &mut ctx.stats) {
            Some(hit) => Tint::opaque(self.lo(&hit, &isec_ray, ctx, s, 0)),
            None => {
                let radiance = scene.background_radiance(ray.dir.normalize());
                let alpha = if radiance.is_black() {
                    scene.bg_alpha()
                } else {
                    1.0
                };
                Tint::new(radiance, alpha)
            }
        }
    }

    /// Outgoing radiance at an intersection: emission, direct lighting,
    /// and a recursive specular bounce up to `max_depth`.
    fn lo(&self, hit: &Hit, ray: &Ray, ctx: &mut RenderContext, s: u32, depth: u32) -> Color {
        let scene = ctx.scene;
        let material = &scene.materials()[hit.material as usize];

        let mut radiance = material.emission(hit);
        let Some(bsdf) = material.bsdf(hit, ray, &ctx.media) else {
            return radiance;
        };

        radiance += self.direct.sample_lights(
            scene,
            hit,
            &bsdf,
            &ctx.samples,
            s,
            ctx.options,
            &mut ctx.stats,
        );

        if depth >= self.max_depth {
            return radiance;
        }

        // Follow perfect-specular bounces; everything else is already
        // covered by the direct term.
        let uv = Vec2::new(ctx.rng.gen(), ctx.rng.gen());
        if let Some(bs) = bsdf.sample(uv) {
            if bs.class == SurfaceClass::Specular {
                let cos = bs.dir.dot(bsdf.normal()).abs();
                let step = bs.f * (cos / bs.pdf.weight_divisor());

                if bs.transmissive {
                    if hit.back {
                        ctx.media.pop();
                    } else {
                        ctx.media.push(material.medium().unwrap_or_default());
                    }
                }

                let mut sub_ray =
                    Ray::new(hit.point, bs.dir, ctx.options.min_trace, f32::INFINITY);
                let sub = match scene.intersect(&mut sub_ray, &mut ctx.stats) {
                    Some(h2) => self.lo(&h2, &sub_ray, ctx, s, depth + 1),
                    None => scene.background_radiance(bs.dir),
                };
                radiance += step * sub;
            }
        }

        radiance
    }
}

/// Path tracing with Russian-roulette termination.
pub struct PathInteg {
    min_path_len: u32,
    rr_term: f32,
    /// One stratified direct-lighting estimator per early path vertex.
    vertex_direct: Vec<DirectIllum>,
    /// BSDF sampling parameters for the early vertices.
    bsdf_channels: Vec<Channel2d>,
    /// Estimator for vertices past the stratified budget.
    deep_direct: DirectIllum,
}

impl PathInteg {
    pub fn new(params: &RenderParams, layout: &mut SampleLayout) -> Self {
        let min_path_len = params.get_uint("min-path-len", 5);
        let rr_term = params.get_float(
            "russian-roulette-terminate-probability,rr-term-prob,rr-term",
            0.5,
        );
        // The path integrator defaults to one light sample per vertex.
        let light_samples = params.get_uint("light-samples", 1);

        let vertex_direct = (0..min_path_len)
            .map(|_| DirectIllum::new(layout, light_samples))
            .collect();
        let bsdf_channels = (0..min_path_len)
            .map(|_| layout.add_channel_2d(1))
            .collect();

        Self {
            min_path_len,
            rr_term,
            vertex_direct,
            bsdf_channels,
            deep_direct: DirectIllum::adhoc(light_samples),
        }
    }

    fn li(&self, ray: Ray, ctx: &mut RenderContext, s: u32) -> Tint {
        let RenderContext {
            scene,
            options,
            samples,
            rng,
            media,
            stats,
        } = ctx;
        let scene = *scene;
        let options = *options;

        let mut isec_ray = ray;
        let mut path_len: u32 = 0;
        // Running product of BSDF/pdf ratios along the path.
        let mut throughput = Color::WHITE;
        let mut after_specular = false;
        let mut radiance = Color::BLACK;
        let mut alpha = 1.0;

        // Grow the path one vertex at a time. Lighting is added at each
        // vertex, then a BSDF sample picks the next direction; the loop
        // ends on escape, on a non-scattering surface, or by roulette.
        loop {
            let Some(hit) = scene.intersect(&mut isec_ray, stats) else {
                // Emission along escaped rays was already accounted for
                // by the previous vertex's direct lighting, except for
                // camera rays and those following a specular bounce.
                if path_len == 0 || after_specular {
                    radiance += throughput * scene.background_radiance(isec_ray.dir.normalize());
                }
                if path_len == 0 && radiance.is_black() {
                    alpha = scene.bg_alpha();
                }
                break;
            };

            let material = &scene.materials()[hit.material as usize];
            if path_len == 0 || after_specular {
                radiance += throughput * material.emission(&hit);
            }

            // A surface with no BSDF ends the path.
            let Some(bsdf) = material.bsdf(&hit, &isec_ray, media) else {
                break;
            };

            let vertex = path_len as usize;
            let direct = if path_len < self.min_path_len {
                self.vertex_direct[vertex]
                    .sample_lights(scene, &hit, &bsdf, samples, s, options, stats)
            } else {
                self.deep_direct
                    .sample_lights_rng(scene, &hit, &bsdf, rng, options, stats)
            };
            radiance += throughput * direct;

            // Choose the next direction.
            let uv = if path_len < self.min_path_len {
                samples.get_2d(self.bsdf_channels[vertex], s, 0)
            } else {
                Vec2::new(rng.gen(), rng.gen())
            };
            let Some(bs) = bsdf.sample(uv) else {
                break;
            };
            if let Pdf::Density(p) = bs.pdf {
                if p <= 0.0 {
                    break;
                }
            }

            // Russian roulette once the path is long enough; survivors
            // are boosted to keep the estimator unbiased.
            if path_len >= self.min_path_len {
                if rng.gen::<f32>() < self.rr_term {
                    break;
                }
                throughput /= 1.0 - self.rr_term;
            }

            let cos = bs.dir.dot(bsdf.normal()).abs();
            throughput *= bs.f * (cos / bs.pdf.weight_divisor());

            // Crossing a refractive boundary updates the media nesting.
            if bs.transmissive {
                if hit.back {
                    media.pop();
                } else {
                    media.push(material.medium().unwrap_or_default());
                }
            }

            isec_ray = Ray::new(hit.point, bs.dir, options.min_trace, f32::INFINITY);
            after_specular = bs.class == SurfaceClass::Specular;
            path_len += 1;
        }

        Tint::new(radiance, alpha)
    }
}
