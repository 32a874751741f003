//! Analytic sphere surface.

use glint_math::{Aabb, Ray, Vec3};

use crate::surface::{orient_normal, AnyHit, Hit};

#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material: u32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: u32) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }

    pub fn bbox(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        Aabb::from_points(self.center - r, self.center + r)
    }

    /// Nearest quadratic root within the ray's interval, if any.
    fn nearest_root(&self, ray: &Ray) -> Option<f32> {
        let oc = ray.origin - self.center;
        let a = ray.dir.length_squared();
        let half_b = oc.dot(ray.dir);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        let mut root = (-half_b - sqrtd) / a;
        if !ray.contains(root) {
            root = (-half_b + sqrtd) / a;
            if !ray.contains(root) {
                return None;
            }
        }
        Some(root)
    }

    pub fn intersect(&self, ray: &mut Ray, index: u32) -> Option<Hit> {
        let t = self.nearest_root(ray)?;
        let point = ray.at(t);
        let outward = (point - self.center) / self.radius;
        let (normal, back) = orient_normal(outward, ray.dir);

        ray.shorten(t);
        Some(Hit {
            t,
            point,
            geom_normal: normal,
            normal,
            back,
            surface: index,
            material: self.material,
            smoothing_group: None,
        })
    }

    pub fn intersects(&self, ray: &Ray) -> Option<AnyHit> {
        let t = self.nearest_root(ray)?;
        let outward = ray.at(t) - self.center;
        Some(AnyHit {
            t,
            back: outward.dot(ray.dir) > 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit_front() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, 0);
        let mut ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), 1e-3, f32::INFINITY);

        let hit = sphere.intersect(&mut ray, 5).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-4);
        assert!((hit.normal - Vec3::Z).length() < 1e-4);
        assert!(!hit.back);
        assert_eq!(hit.surface, 5);
    }

    #[test]
    fn test_sphere_hit_from_inside() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0, 0);
        let mut ray = Ray::new(Vec3::ZERO, Vec3::X, 1e-3, f32::INFINITY);

        let hit = sphere.intersect(&mut ray, 0).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-4);
        assert!(hit.back);
        // Normal flipped to oppose the ray.
        assert!(hit.normal.dot(ray.dir) < 0.0);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(Vec3::new(0.0, 5.0, 0.0), 1.0, 0);
        let ray = Ray::new(Vec3::ZERO, Vec3::X, 1e-3, f32::INFINITY);
        assert!(sphere.intersects(&ray).is_none());
    }

    #[test]
    fn test_sphere_bbox() {
        let sphere = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 2.0, 0);
        let bbox = sphere.bbox();
        assert_eq!(bbox.min(), Vec3::new(-1.0, 0.0, 1.0));
        assert_eq!(bbox.max(), Vec3::new(3.0, 4.0, 5.0));
    }
}
