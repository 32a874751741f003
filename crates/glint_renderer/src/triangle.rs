//! Mesh-triangle surface: Möller-Trumbore intersection with smooth
//! shading normals.

use glint_core::Mesh;
use glint_math::{Aabb, Ray, Vec3};

use crate::surface::{orient_normal, AnyHit, Hit};

/// How far a terminator-clamped shading normal is tilted back toward the
/// viewer, to keep its sign against the ray stable.
const TERMINATOR_NUDGE: f32 = 1e-4;

/// One triangle of a mesh, referenced by index pair.
#[derive(Debug, Clone, Copy)]
pub struct MeshTri {
    pub mesh: u32,
    pub tri: u32,
}

/// Result of the raw Möller-Trumbore test.
struct RawHit {
    t: f32,
    u: f32,
    v: f32,
}

/// Möller-Trumbore ray/triangle test against (v0, v1-v0, v2-v0).
fn moller_trumbore(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<RawHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.dir.cross(edge2);
    let a = edge1.dot(h);

    // Ray parallel to the triangle plane.
    if a.abs() < 1e-12 {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if !ray.contains(t) {
        return None;
    }

    Some(RawHit { t, u, v })
}

impl MeshTri {
    fn mesh_and_tri<'a>(&self, meshes: &'a [Mesh]) -> (&'a Mesh, &'a glint_core::MeshTriangle) {
        let mesh = &meshes[self.mesh as usize];
        (mesh, &mesh.triangles()[self.tri as usize])
    }

    pub fn material(&self, meshes: &[Mesh]) -> u32 {
        let (_, tri) = self.mesh_and_tri(meshes);
        tri.material
    }

    /// Triangles of a smoothed mesh share the mesh's identity as their
    /// smoothing group; faceted meshes have none.
    pub fn smoothing_group(&self, meshes: &[Mesh]) -> Option<u32> {
        let (mesh, _) = self.mesh_and_tri(meshes);
        mesh.normals().map(|_| self.mesh)
    }

    pub fn bbox(&self, meshes: &[Mesh]) -> Aabb {
        let (mesh, tri) = self.mesh_and_tri(meshes);
        let [v0, v1, v2] = mesh.tri_corners(tri);
        let mut bbox = Aabb::from_points(v0, v1);
        bbox.grow(v2);
        bbox
    }

    pub fn intersect(&self, ray: &mut Ray, meshes: &[Mesh], index: u32) -> Option<Hit> {
        let (mesh, tri) = self.mesh_and_tri(meshes);
        let [v0, v1, v2] = mesh.tri_corners(tri);
        let raw = moller_trumbore(ray, v0, v1, v2)?;

        let face_normal = mesh.raw_normal(tri).normalize();
        let (geom_normal, back) = orient_normal(face_normal, ray.dir);

        let normal = match mesh.normals() {
            Some(normals) => {
                let n0 = normals[tri.v[0] as usize];
                let n1 = normals[tri.v[1] as usize];
                let n2 = normals[tri.v[2] as usize];
                let blended =
                    ((1.0 - raw.u - raw.v) * n0 + raw.u * n1 + raw.v * n2).normalize();
                let oriented = if back { -blended } else { blended };
                clamp_terminator(oriented, ray.dir)
            }
            None => geom_normal,
        };

        ray.shorten(raw.t);
        Some(Hit {
            t: raw.t,
            point: ray.at(raw.t),
            geom_normal,
            normal,
            back,
            surface: index,
            material: tri.material,
            smoothing_group: self.smoothing_group(meshes),
        })
    }

    pub fn intersects(&self, ray: &Ray, meshes: &[Mesh]) -> Option<AnyHit> {
        let (mesh, tri) = self.mesh_and_tri(meshes);
        let [v0, v1, v2] = mesh.tri_corners(tri);
        let raw = moller_trumbore(ray, v0, v1, v2)?;

        let face_normal = mesh.raw_normal(tri);
        Some(AnyHit {
            t: raw.t,
            back: face_normal.dot(ray.dir) > 0.0,
        })
    }
}

/// Keep an interpolated shading normal on the viewer's side of the ray.
///
/// Near silhouettes the barycentric blend can tilt past perpendicular,
/// which would flip cos(theta) signs along the terminator. Clamp the
/// normal perpendicular to the ray and nudge it minutely back toward the
/// viewer.
fn clamp_terminator(normal: Vec3, ray_dir: Vec3) -> Vec3 {
    let dir = ray_dir.normalize();
    if normal.dot(dir) <= 0.0 {
        return normal;
    }
    let perp = normal - dir * normal.dot(dir);
    (perp - dir * TERMINATOR_NUDGE).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_tri_mesh() -> Mesh {
        // Triangle in the XY plane at z = -1.
        let mut mesh = Mesh::new("tri");
        let a = mesh.add_vertex(Vec3::new(-1.0, -1.0, -1.0));
        let b = mesh.add_vertex(Vec3::new(1.0, -1.0, -1.0));
        let c = mesh.add_vertex(Vec3::new(0.0, 1.0, -1.0));
        mesh.add_triangle(a, b, c, 0);
        mesh
    }

    #[test]
    fn test_triangle_hit() {
        let meshes = vec![one_tri_mesh()];
        let tri = MeshTri { mesh: 0, tri: 0 };

        let mut ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), 1e-3, f32::INFINITY);
        let hit = tri.intersect(&mut ray, &meshes, 0).unwrap();

        assert!((hit.t - 1.0).abs() < 1e-4);
        assert_eq!(ray.t1, hit.t);
        // Normal opposes the ray.
        assert!(hit.normal.dot(ray.dir) < 0.0);
        assert!(!hit.back);
    }

    #[test]
    fn test_triangle_miss() {
        let meshes = vec![one_tri_mesh()];
        let tri = MeshTri { mesh: 0, tri: 0 };

        let mut ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), 1e-3, f32::INFINITY);
        assert!(tri.intersect(&mut ray, &meshes, 0).is_none());
        assert_eq!(ray.t1, f32::INFINITY);
    }

    #[test]
    fn test_triangle_back_face() {
        let meshes = vec![one_tri_mesh()];
        let tri = MeshTri { mesh: 0, tri: 0 };

        // Approach from behind the plane.
        let mut ray = Ray::new(
            Vec3::new(0.0, 0.0, -2.0),
            Vec3::new(0.0, 0.0, 1.0),
            1e-3,
            f32::INFINITY,
        );
        let hit = tri.intersect(&mut ray, &meshes, 0).unwrap();
        assert!(hit.back);
        assert!(hit.geom_normal.dot(ray.dir) < 0.0);
    }

    #[test]
    fn test_triangle_interval_respected() {
        let meshes = vec![one_tri_mesh()];
        let tri = MeshTri { mesh: 0, tri: 0 };

        // Hit lies at t = 1, beyond the ray's interval.
        let mut ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), 1e-3, 0.5);
        assert!(tri.intersect(&mut ray, &meshes, 0).is_none());
    }

    #[test]
    fn test_smoothing_group_needs_normals() {
        let mut mesh = one_tri_mesh();
        let tri = MeshTri { mesh: 0, tri: 0 };

        assert_eq!(tri.smoothing_group(&[mesh.clone()]), None);
        mesh.compute_vertex_normals(std::f32::consts::PI).unwrap();
        assert_eq!(tri.smoothing_group(&[mesh]), Some(0));
    }

    #[test]
    fn test_terminator_clamp() {
        let dir = Vec3::new(0.0, 0.0, -1.0);
        // A normal tilted past perpendicular, onto the ray's side.
        let bad = Vec3::new(0.8, 0.0, -0.6).normalize();
        let fixed = clamp_terminator(bad, dir);

        assert!(fixed.dot(dir) < 0.0);
        assert!((fixed.length() - 1.0).abs() < 1e-5);
        // A healthy normal passes through untouched.
        let good = Vec3::new(0.0, 0.0, 1.0);
        assert_eq!(clamp_terminator(good, dir), good);
    }
}
