//! The surface contract: what the octree and integrators see of geometry.

use glint_core::Mesh;
use glint_math::{Aabb, Ray, Vec3};

use crate::{Disc, MeshTri, Sphere};

/// Record of a closest-hit query.
///
/// Everything rendering needs at a path vertex, as a plain value: the
/// intersection position, both normals (oriented to oppose the ray),
/// and indices back into the scene's dense surface/material arrays.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    /// Ray parameter of the intersection.
    pub t: f32,
    /// World-space intersection point.
    pub point: Vec3,
    /// Geometric (face) normal, unit, flipped to oppose the ray.
    pub geom_normal: Vec3,
    /// Shading normal (interpolated where available), unit, opposing the
    /// ray, terminator-clamped.
    pub normal: Vec3,
    /// True if the ray struck the back of the surface.
    pub back: bool,
    /// Index of the surface in the scene's surface array.
    pub surface: u32,
    /// Index of the material in the scene's material array.
    pub material: u32,
    /// Shared identity for mutual back-face shadow suppression.
    pub smoothing_group: Option<u32>,
}

/// Record of an any-hit (occlusion) query: just enough to apply the
/// smoothing-group shadow policy.
#[derive(Debug, Clone, Copy)]
pub struct AnyHit {
    pub t: f32,
    pub back: bool,
}

/// A renderable surface.
///
/// Surfaces live in one dense array owned by the scene; hot dispatch is
/// a match on this tag rather than a virtual call through a pointer.
#[derive(Debug, Clone, Copy)]
pub enum Surface {
    Tri(MeshTri),
    Sphere(Sphere),
    Disc(Disc),
}

impl Surface {
    /// Closest-hit query. On a hit within the ray's interval, narrows the
    /// ray to the hit distance and returns the full hit record.
    pub fn intersect(&self, ray: &mut Ray, meshes: &[Mesh], index: u32) -> Option<Hit> {
        match self {
            Surface::Tri(tri) => tri.intersect(ray, meshes, index),
            Surface::Sphere(sphere) => sphere.intersect(ray, index),
            Surface::Disc(disc) => disc.intersect(ray, index),
        }
    }

    /// Any-hit query; the ray is never modified.
    pub fn intersects(&self, ray: &Ray, meshes: &[Mesh]) -> Option<AnyHit> {
        match self {
            Surface::Tri(tri) => tri.intersects(ray, meshes),
            Surface::Sphere(sphere) => sphere.intersects(ray),
            Surface::Disc(disc) => disc.intersects(ray),
        }
    }

    pub fn bbox(&self, meshes: &[Mesh]) -> Aabb {
        match self {
            Surface::Tri(tri) => tri.bbox(meshes),
            Surface::Sphere(sphere) => sphere.bbox(),
            Surface::Disc(disc) => disc.bbox(),
        }
    }

    /// The smoothing group this surface belongs to, if any.
    pub fn smoothing_group(&self, meshes: &[Mesh]) -> Option<u32> {
        match self {
            Surface::Tri(tri) => tri.smoothing_group(meshes),
            _ => None,
        }
    }

    /// Material slot in the scene's material array.
    pub fn material(&self, meshes: &[Mesh]) -> u32 {
        match self {
            Surface::Tri(tri) => tri.material(meshes),
            Surface::Sphere(sphere) => sphere.material,
            Surface::Disc(disc) => disc.material,
        }
    }
}

/// Flip `outward` so it opposes `ray_dir`; returns the oriented normal
/// and whether the original pointed with the ray (a back-face hit).
#[inline]
pub(crate) fn orient_normal(outward: Vec3, ray_dir: Vec3) -> (Vec3, bool) {
    if outward.dot(ray_dir) > 0.0 {
        (-outward, true)
    } else {
        (outward, false)
    }
}
