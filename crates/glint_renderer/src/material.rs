//! Surface materials.
//!
//! A material answers four questions: what kind of shadow it casts, what
//! it emits, what refractive medium it encloses, and which BSDF to
//! instantiate at an intersection. Materials live in the scene's dense
//! array and are referenced by index from surfaces.

use glint_core::Color;
use glint_math::{Frame, Ray};

use crate::bsdf::{Bsdf, BsdfKind};
use crate::media::{MediaStack, Medium};
use crate::surface::Hit;

/// How a material behaves in occlusion queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowKind {
    /// Casts no shadow at all.
    None,
    /// Attenuates light passing through without redirecting it.
    Partial,
    /// Blocks light completely.
    Opaque,
}

#[derive(Debug, Clone)]
pub enum Material {
    /// Ideal diffuse reflector.
    Lambertian { albedo: Color },
    /// Specular reflector, optionally Fresnel-weighted over a diffuse
    /// underlayer (`ior` = 0 disables the Fresnel term).
    Mirror {
        reflectance: Color,
        diffuse: Color,
        ior: f32,
    },
    /// Refractive dielectric.
    Glass { ior: f32 },
    /// Phong-lobe glossy reflector.
    Glossy { reflectance: Color, exponent: f32 },
    /// Pure emitter; `light` links back to the scene light sampling this
    /// surface, for MIS pdf evaluation when a BSDF sample lands on it.
    Emitter { radiance: Color, light: Option<u32> },
}

impl Material {
    pub fn lambertian(albedo: Color) -> Self {
        Material::Lambertian { albedo }
    }

    pub fn mirror(reflectance: Color) -> Self {
        Material::Mirror {
            reflectance,
            diffuse: Color::BLACK,
            ior: 0.0,
        }
    }

    /// Fresnel mirror: the Fresnel term weights the specular coat
    /// against the diffuse underlayer.
    pub fn mirror_over(reflectance: Color, diffuse: Color, ior: f32) -> Self {
        Material::Mirror {
            reflectance,
            diffuse,
            ior,
        }
    }

    pub fn glass(ior: f32) -> Self {
        Material::Glass { ior }
    }

    pub fn glossy(reflectance: Color, exponent: f32) -> Self {
        Material::Glossy {
            reflectance,
            exponent,
        }
    }

    pub fn emitter(radiance: Color) -> Self {
        Material::Emitter {
            radiance,
            light: None,
        }
    }

    pub fn shadow_kind(&self) -> ShadowKind {
        match self {
            Material::Glass { .. } => ShadowKind::Partial,
            _ => ShadowKind::Opaque,
        }
    }

    /// Radiance emitted toward the viewer at `hit` (front side only).
    pub fn emission(&self, hit: &Hit) -> Color {
        match self {
            Material::Emitter { radiance, .. } if !hit.back => *radiance,
            _ => Color::BLACK,
        }
    }

    /// The light this material's surface is sampled by, if any.
    pub fn emitter_light(&self) -> Option<u32> {
        match self {
            Material::Emitter { light, .. } => *light,
            _ => None,
        }
    }

    /// The refractive medium enclosed by this material's surfaces.
    pub fn medium(&self) -> Option<Medium> {
        match self {
            Material::Glass { ior } => Some(Medium::new(*ior)),
            _ => None,
        }
    }

    /// Transmittance applied by occlusion queries for `Partial` shadows.
    ///
    /// For glass this is the normal-incidence transmission; the angular
    /// dependence is deliberately ignored in shadow rays.
    pub fn transmittance(&self) -> Color {
        match self {
            Material::Glass { ior } => {
                let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
                Color::gray(1.0 - r0)
            }
            _ => Color::BLACK,
        }
    }

    /// Instantiate this material's BSDF at an intersection, or None for
    /// a pure emitter.
    ///
    /// `media` supplies the refraction context: the IOR ratio a glass
    /// interface sees depends on the medium the path is currently inside.
    pub fn bsdf(&self, hit: &Hit, ray: &Ray, media: &MediaStack) -> Option<Bsdf> {
        let kind = match self {
            Material::Lambertian { albedo } => BsdfKind::Lambert { albedo: *albedo },
            Material::Mirror {
                reflectance,
                diffuse,
                ior,
            } => BsdfKind::Mirror {
                reflectance: *reflectance,
                diffuse: *diffuse,
                ior: *ior,
            },
            Material::Glass { ior } => {
                // Ratio n_incoming / n_transmitted across this interface.
                let eta = if hit.back {
                    *ior / media.enclosing().ior
                } else {
                    media.top().ior / *ior
                };
                BsdfKind::Glass { eta }
            }
            Material::Glossy {
                reflectance,
                exponent,
            } => BsdfKind::Phong {
                reflectance: *reflectance,
                exponent: *exponent,
            },
            Material::Emitter { .. } => return None,
        };

        let frame = Frame::from_normal(hit.point, hit.normal);
        let viewer = frame.to_local(-ray.dir.normalize());
        Some(Bsdf::new(frame, viewer, kind))
    }

    pub(crate) fn link_light(&mut self, index: u32) {
        if let Material::Emitter { light, .. } = self {
            *light = Some(index);
        }
    }
}
