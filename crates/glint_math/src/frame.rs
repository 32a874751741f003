use crate::Vec3;

/// An orthonormal basis plus origin.
///
/// Shading code works in a frame whose z axis is the surface normal, so
/// cos(theta) of a local direction is just its z component.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub origin: Vec3,
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
}

impl Frame {
    /// Create a frame from an origin and three orthonormal axes.
    pub fn new(origin: Vec3, x: Vec3, y: Vec3, z: Vec3) -> Self {
        Self { origin, x, y, z }
    }

    /// Build a frame whose z axis is `normal` (assumed unit length).
    ///
    /// Branchless tangent construction (Duff et al.), stable for all
    /// normal orientations.
    pub fn from_normal(origin: Vec3, normal: Vec3) -> Self {
        let sign = if normal.z >= 0.0 { 1.0 } else { -1.0 };
        let a = -1.0 / (sign + normal.z);
        let b = normal.x * normal.y * a;

        let x = Vec3::new(
            1.0 + sign * normal.x * normal.x * a,
            sign * b,
            -sign * normal.x,
        );
        let y = Vec3::new(b, sign + normal.y * normal.y * a, -normal.y);

        Self {
            origin,
            x,
            y,
            z: normal,
        }
    }

    /// Transform a direction from world space into this frame.
    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.x), v.dot(self.y), v.dot(self.z))
    }

    /// Transform a direction from this frame into world space.
    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    /// Transform a point from this frame into world space.
    #[inline]
    pub fn point_to_world(&self, p: Vec3) -> Vec3 {
        self.origin + self.to_world(p)
    }
}
