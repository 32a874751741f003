// Re-export glam for convenience
pub use glam::*;

// Glint math types
mod aabb;
mod frame;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use frame::Frame;
pub use interval::Interval;
pub use ray::Ray;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_indexing() {
        // The Aabb slab test addresses ray components by axis index.
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v[0], v.x);
        assert_eq!(v[1], v.y);
        assert_eq!(v[2], v.z);
    }

    #[test]
    fn test_edge_cross_gives_face_normal() {
        // Triangle face normals come from edge cross products; a CCW
        // triangle in the xy plane faces +z.
        let (v0, v1, v2) = (Vec3::ZERO, Vec3::X, Vec3::Y);
        let n = (v1 - v0).cross(v2 - v0);
        assert_eq!(n, Vec3::Z);
    }

    #[test]
    fn test_normalize_or_zero_degenerate() {
        // Environment-map lookups lean on the zero-safe normalize.
        assert_eq!(Vec3::ZERO.normalize_or_zero(), Vec3::ZERO);
        let d = Vec3::new(0.0, 3.0, 4.0).normalize_or_zero();
        assert!((d.length() - 1.0).abs() < 1e-6);
    }
}
