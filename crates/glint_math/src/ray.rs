use crate::{Interval, Vec3};

/// A ray in 3D space with origin, direction, and a parametric interval.
///
/// The interval `[t0, t1)` bounds the ray: a point is on the ray iff it
/// equals `origin + t * dir` for some `t0 <= t < t1`. Intersection code
/// narrows `t1` to the closest hit found so far; it never widens it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    pub t0: f32,
    pub t1: f32,
}

impl Ray {
    /// Create a new bounded ray.
    pub fn new(origin: Vec3, dir: Vec3, t0: f32, t1: f32) -> Self {
        debug_assert!(t0 >= 0.0 && t0 < t1);
        Self { origin, dir, t0, t1 }
    }

    /// Create a ray from `origin` to `target`, with `t1` at the target.
    ///
    /// The direction is left un-normalized so that `t = 1` lands exactly
    /// on `target`; shadow rays use this to bound the search at the light.
    pub fn toward(origin: Vec3, target: Vec3, t0: f32) -> Self {
        Self::new(origin, target - origin, t0, 1.0)
    }

    /// Get the point along the ray at parameter t.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// The endpoint of the ray, `at(t1)`.
    #[inline]
    pub fn end(&self) -> Vec3 {
        self.at(self.t1)
    }

    /// The ray's parametric interval as an [`Interval`].
    #[inline]
    pub fn span(&self) -> Interval {
        Interval::new(self.t0, self.t1)
    }

    /// Narrow the ray to end at parameter `t`.
    ///
    /// `t` must lie inside the current interval; the interval only ever
    /// shrinks.
    #[inline]
    pub fn shorten(&mut self, t: f32) {
        debug_assert!(t >= self.t0 && t <= self.t1);
        self.t1 = t;
    }

    /// True if `t` lies within the ray's half-open interval.
    #[inline]
    pub fn contains(&self, t: f32) -> bool {
        t >= self.t0 && t < self.t1
    }

    /// A copy of this ray with a unit-length direction (interval rescaled
    /// to keep the same endpoints).
    pub fn unit_dir(&self) -> Ray {
        let len = self.dir.length();
        Ray {
            origin: self.origin,
            dir: self.dir / len,
            t0: self.t0 * len,
            t1: self.t1 * len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X, 0.0, f32::INFINITY);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_toward() {
        let ray = Ray::toward(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0), 0.0);
        assert_eq!(ray.end(), Vec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn test_ray_shorten() {
        let mut ray = Ray::new(Vec3::ZERO, Vec3::X, 0.0, 10.0);
        ray.shorten(4.0);
        assert_eq!(ray.t1, 4.0);
        assert!(ray.contains(3.9));
        assert!(!ray.contains(4.0));
    }

    #[test]
    fn test_ray_unit_dir() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), 0.0, 1.0);
        let unit = ray.unit_dir();
        assert!((unit.dir.length() - 1.0).abs() < 1e-6);
        assert!((unit.end() - ray.end()).length() < 1e-6);
    }
}
