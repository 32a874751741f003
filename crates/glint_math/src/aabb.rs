use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box, defined by three intervals (one per axis).
///
/// Used both for surface bounds and as the node volumes of the octree.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// Create an AABB from two corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Grow this AABB to include the point `p`.
    pub fn grow(&mut self, p: Vec3) {
        self.x = Interval::new(self.x.min.min(p.x), self.x.max.max(p.x));
        self.y = Interval::new(self.y.min.min(p.y), self.y.max.max(p.y));
        self.z = Interval::new(self.z.min.min(p.z), self.z.max.max(p.z));
    }

    /// The minimum corner.
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    /// The maximum corner.
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Test if a ray intersects this AABB within the given interval.
    ///
    /// Uses the slab method. Returns the clipped entry distance on a hit,
    /// which lets octree traversal prune nodes whose entry lies beyond the
    /// closest hit found so far.
    pub fn entry_distance(&self, r: &Ray, mut ray_t: Interval) -> Option<f32> {
        for axis in 0..3 {
            let iv = self.axis_interval(axis);
            let orig = r.origin[axis];
            let adinv = 1.0 / r.dir[axis];

            let mut t0 = (iv.min - orig) * adinv;
            let mut t1 = (iv.max - orig) * adinv;
            if adinv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max <= ray_t.min {
                return None;
            }
        }
        Some(ray_t.min)
    }

    /// Test if a ray intersects this AABB within the given interval.
    pub fn hit(&self, r: &Ray, ray_t: Interval) -> bool {
        self.entry_distance(r, ray_t).is_some()
    }

    /// True if `other` lies entirely within this box (inclusive).
    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.x.min <= other.x.min
            && other.x.max <= self.x.max
            && self.y.min <= other.y.min
            && other.y.max <= self.y.max
            && self.z.min <= other.z.min
            && other.z.max <= self.z.max
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    /// A sphere that encloses this box: (center, radius).
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        let center = self.centroid();
        (center, (self.max() - center).length())
    }

    /// The smallest cube sharing this box's centroid that contains it.
    ///
    /// Octree roots are cubic so that midpoint subdivision yields cubic
    /// children at every level.
    pub fn cube(&self) -> Aabb {
        let center = self.centroid();
        let half = self
            .x
            .size()
            .max(self.y.size())
            .max(self.z.size())
            .max(f32::MIN_POSITIVE)
            * 0.5;
        let r = Vec3::splat(half);
        Aabb::from_points(center - r, center + r)
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_hit() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));

        // Ray pointing at center
        let ray = Ray::new(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::new(0.0, 0.0, 1.0),
            0.0,
            100.0,
        );
        assert!(aabb.hit(&ray, ray.span()));

        // Ray pointing away
        let ray = Ray::new(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::new(0.0, 0.0, -1.0),
            0.0,
            100.0,
        );
        assert!(!aabb.hit(&ray, ray.span()));

        // Ray missing the box
        let ray = Ray::new(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            0.0,
            100.0,
        );
        assert!(!aabb.hit(&ray, ray.span()));
    }

    #[test]
    fn test_aabb_entry_distance() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, -1.0, 3.0), Vec3::new(1.0, 1.0, 5.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::Z, 0.0, 100.0);

        let entry = aabb.entry_distance(&ray, ray.span()).unwrap();
        assert!((entry - 3.0).abs() < 1e-5);

        // Origin inside the box clips the entry to t0.
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let entry = aabb.entry_distance(&ray, ray.span()).unwrap();
        assert_eq!(entry, 0.0);
    }

    #[test]
    fn test_aabb_contains_box() {
        let outer = Aabb::from_points(Vec3::ZERO, Vec3::splat(10.0));
        let inner = Aabb::from_points(Vec3::splat(2.0), Vec3::splat(3.0));
        let straddle = Aabb::from_points(Vec3::splat(8.0), Vec3::splat(12.0));

        assert!(outer.contains_box(&inner));
        assert!(!outer.contains_box(&straddle));
        assert!(!inner.contains_box(&outer));
    }

    #[test]
    fn test_aabb_cube() {
        let thin = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 2.0, 4.0));
        let cube = thin.cube();
        assert!((cube.x.size() - 10.0).abs() < 1e-5);
        assert!((cube.y.size() - 10.0).abs() < 1e-5);
        assert!((cube.z.size() - 10.0).abs() < 1e-5);
        assert!(cube.contains_box(&thin));
    }

    #[test]
    fn test_aabb_bounding_sphere() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let (center, radius) = aabb.bounding_sphere();
        assert_eq!(center, Vec3::ZERO);
        assert!((radius - 3f32.sqrt()).abs() < 1e-5);
    }
}
