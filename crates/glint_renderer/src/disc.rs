//! Flat disc surface, the geometry backing area lights.

use glint_math::{Aabb, Ray, Vec3};

use crate::surface::{orient_normal, AnyHit, Hit};

#[derive(Debug, Clone, Copy)]
pub struct Disc {
    pub center: Vec3,
    /// Unit plane normal; emission leaves this side.
    pub normal: Vec3,
    pub radius: f32,
    pub material: u32,
}

impl Disc {
    pub fn new(center: Vec3, normal: Vec3, radius: f32, material: u32) -> Self {
        Self {
            center,
            normal: normal.normalize(),
            radius,
            material,
        }
    }

    pub fn area(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius
    }

    pub fn bbox(&self) -> Aabb {
        // Conservative: the disc fits its bounding sphere's box.
        let r = Vec3::splat(self.radius);
        Aabb::from_points(self.center - r, self.center + r)
    }

    /// Plane intersection clipped to the disc radius.
    fn plane_hit(&self, ray: &Ray) -> Option<f32> {
        let denom = ray.dir.dot(self.normal);
        if denom.abs() < 1e-12 {
            return None;
        }
        let t = (self.center - ray.origin).dot(self.normal) / denom;
        if !ray.contains(t) {
            return None;
        }
        let p = ray.at(t);
        if (p - self.center).length_squared() > self.radius * self.radius {
            return None;
        }
        Some(t)
    }

    pub fn intersect(&self, ray: &mut Ray, index: u32) -> Option<Hit> {
        let t = self.plane_hit(ray)?;
        let (normal, back) = orient_normal(self.normal, ray.dir);

        ray.shorten(t);
        Some(Hit {
            t,
            point: ray.at(t),
            geom_normal: normal,
            normal,
            back,
            surface: index,
            material: self.material,
            smoothing_group: None,
        })
    }

    pub fn intersects(&self, ray: &Ray) -> Option<AnyHit> {
        let t = self.plane_hit(ray)?;
        Some(AnyHit {
            t,
            back: self.normal.dot(ray.dir) > 0.0,
        })
    }
}
