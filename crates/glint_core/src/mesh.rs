//! Triangle-mesh geometry.
//!
//! A mesh stores its data in parallel arrays: vertex positions, optional
//! per-vertex normals, and triangle index triples each carrying a material
//! slot. Normals are all-or-nothing: adding an explicit normal to a mesh
//! first backfills normals for every vertex that lacks one, so rendering
//! never sees a partially-smoothed mesh.

use glint_math::{Aabb, Vec3};
use thiserror::Error;

/// Index of a vertex within its mesh.
pub type VertIndex = u32;

/// Errors raised while building a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Two faces sharing a vertex had anti-parallel normals during
    /// smoothing; the mesh's winding is inconsistent.
    #[error("{mesh}: face orientation mismatch while smoothing mesh")]
    OrientationMismatch { mesh: String },
}

/// One triangle: three vertex indices and a material slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshTriangle {
    pub v: [VertIndex; 3],
    pub material: u32,
}

/// A triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    name: String,
    positions: Vec<Vec3>,
    /// Either empty, or exactly one normal per vertex.
    normals: Vec<Vec3>,
    triangles: Vec<MeshTriangle>,
    /// Flips the winding convention used for face normals.
    pub left_handed: bool,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> VertIndex {
        self.positions.push(pos);
        (self.positions.len() - 1) as VertIndex
    }

    /// Add a vertex with an explicit normal.
    ///
    /// If earlier vertices were added without normals, they are smoothed
    /// first (which may split vertices), keeping the all-or-nothing
    /// normal invariant.
    pub fn add_vertex_with_normal(
        &mut self,
        pos: Vec3,
        normal: Vec3,
    ) -> Result<VertIndex, MeshError> {
        if self.normals.len() < self.positions.len() {
            self.compute_vertex_normals(std::f32::consts::PI)?;
        }
        self.positions.push(pos);
        self.normals.push(normal.normalize());
        Ok((self.positions.len() - 1) as VertIndex)
    }

    /// Add a triangle over existing vertices.
    ///
    /// Degenerate triangles (out-of-range indices, non-finite or
    /// coincident vertices, zero area) are dropped with a warning rather
    /// than poisoning the render.
    pub fn add_triangle(&mut self, a: VertIndex, b: VertIndex, c: VertIndex, material: u32) {
        let n = self.positions.len() as u32;
        if a >= n || b >= n || c >= n {
            log::warn!(
                "{}: triangle ({a}, {b}, {c}) references missing vertices, dropped",
                self.name
            );
            return;
        }

        let tri = MeshTriangle {
            v: [a, b, c],
            material,
        };
        let [v0, v1, v2] = self.tri_corners(&tri);
        let finite = v0.is_finite() && v1.is_finite() && v2.is_finite();
        if !finite || (v1 - v0).cross(v2 - v0).length_squared() == 0.0 {
            log::warn!("{}: degenerate triangle ({a}, {b}, {c}) dropped", self.name);
            return;
        }

        self.triangles.push(tri);
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Per-vertex normals, if the mesh is smoothed.
    pub fn normals(&self) -> Option<&[Vec3]> {
        if self.normals.is_empty() {
            None
        } else {
            debug_assert_eq!(self.normals.len(), self.positions.len());
            Some(&self.normals)
        }
    }

    pub fn triangles(&self) -> &[MeshTriangle] {
        &self.triangles
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Corner positions of a triangle.
    #[inline]
    pub fn tri_corners(&self, tri: &MeshTriangle) -> [Vec3; 3] {
        [
            self.positions[tri.v[0] as usize],
            self.positions[tri.v[1] as usize],
            self.positions[tri.v[2] as usize],
        ]
    }

    /// Unnormalized face normal of a triangle, honoring handedness.
    #[inline]
    pub fn raw_normal(&self, tri: &MeshTriangle) -> Vec3 {
        let [v0, v1, v2] = self.tri_corners(tri);
        let n = (v1 - v0).cross(v2 - v0);
        if self.left_handed {
            -n
        } else {
            n
        }
    }

    /// Bounding box of all vertices.
    pub fn bbox(&self) -> Aabb {
        let mut bbox = Aabb::EMPTY;
        for p in &self.positions {
            bbox.grow(*p);
        }
        bbox
    }

    /// Compute a normal for each vertex that doesn't already have one, by
    /// averaging the normals of its incident faces.
    ///
    /// `max_angle` (radians) is the largest angle allowed between a face
    /// normal and the running average of its vertex's normal group. A
    /// face exceeding it opens a new group, and the vertex is duplicated
    /// so the face's index can be rewritten to the copy; the mesh keeps a
    /// hard crease there. A face anti-parallel to an existing group is an
    /// orientation mismatch and fails the whole mesh.
    pub fn compute_vertex_normals(&mut self, max_angle: f32) -> Result<(), MeshError> {
        let base = self.normals.len() as VertIndex;
        if (base as usize) == self.positions.len() {
            return Ok(());
        }

        let mut groups = NormGroups::new(max_angle.cos(), base);

        for t in 0..self.triangles.len() {
            let tri = self.triangles[t];
            let raw = self.raw_normal(&tri);
            let len = raw.length();
            if len == 0.0 {
                continue;
            }
            let face_normal = raw / len;

            for corner in 0..3 {
                let v = self.triangles[t].v[corner];
                if v < base {
                    continue;
                }
                let placed = groups.add_face(face_normal, v, &mut self.positions, &self.name)?;
                self.triangles[t].v[corner] = placed;
            }
        }

        self.normals.resize(self.positions.len(), Vec3::ZERO);
        for (i, group) in groups.groups.iter().enumerate() {
            let v = base as usize + i;
            self.normals[v] = if group.num_faces == 0 {
                // Vertex not referenced by any face; any unit vector does.
                Vec3::Y
            } else {
                group.normal
            };
        }
        Ok(())
    }
}

/// One normal group: the faces assigned to a (possibly duplicated)
/// vertex, and their running average normal.
#[derive(Clone, Default)]
struct Group {
    num_faces: u32,
    normal_sum: Vec3,
    normal: Vec3,
    /// Vertex index of the group split off from this one, if any.
    next: Option<VertIndex>,
}

struct NormGroups {
    min_cos: f32,
    base: VertIndex,
    groups: Vec<Group>,
}

impl NormGroups {
    fn new(min_cos: f32, base: VertIndex) -> Self {
        Self {
            min_cos,
            base,
            groups: Vec::new(),
        }
    }

    /// Assign a face with normal `face_normal` to the normal group of
    /// `vertex`, or to a group split off from it, or to a fresh group
    /// (duplicating the vertex). Returns the vertex index the face ends
    /// up referencing.
    fn add_face(
        &mut self,
        face_normal: Vec3,
        mut vertex: VertIndex,
        positions: &mut Vec<Vec3>,
        mesh_name: &str,
    ) -> Result<VertIndex, MeshError> {
        loop {
            let slot = (vertex - self.base) as usize;
            if slot >= self.groups.len() {
                self.groups.resize(slot + 1, Group::default());
            }
            let group = &mut self.groups[slot];

            if group.num_faces == 0 || face_normal.dot(group.normal) >= self.min_cos {
                group.num_faces += 1;
                group.normal_sum += face_normal;
                group.normal = group.normal_sum.normalize();
                return Ok(vertex);
            }

            if face_normal.dot(group.normal) < 0.0 {
                return Err(MeshError::OrientationMismatch {
                    mesh: mesh_name.to_string(),
                });
            }

            // Doesn't fit this group; follow (or open) the split chain.
            let next = group.next;
            vertex = match next {
                Some(next) => next,
                None => {
                    let dup = positions.len() as VertIndex;
                    let pos = positions[vertex as usize];
                    positions.push(pos);
                    self.groups[slot].next = Some(dup);
                    dup
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> Mesh {
        // Flat unit quad in the XY plane, two triangles.
        let mut mesh = Mesh::new("quad");
        let a = mesh.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Vec3::new(1.0, 1.0, 0.0));
        let d = mesh.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        mesh.add_triangle(a, b, c, 0);
        mesh.add_triangle(a, c, d, 0);
        mesh
    }

    #[test]
    fn test_flat_mesh_smoothing_keeps_vertices() {
        let mut mesh = quad_mesh();
        mesh.compute_vertex_normals(20f32.to_radians()).unwrap();

        // Coplanar faces all share one normal group per vertex.
        assert_eq!(mesh.vertex_count(), 4);
        for n in mesh.normals().unwrap() {
            assert!((*n - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_crease_splits_vertices() {
        // Two faces meeting at a 90-degree fold along the Y axis.
        let mut mesh = Mesh::new("fold");
        let a = mesh.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        let c = mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        let d = mesh.add_vertex(Vec3::new(0.0, 0.0, 1.0));
        mesh.add_triangle(a, c, b, 0);
        mesh.add_triangle(a, b, d, 0);

        let before = mesh.vertex_count();
        mesh.compute_vertex_normals(20f32.to_radians()).unwrap();

        // The fold exceeds max_angle, so the shared edge vertices split.
        assert!(mesh.vertex_count() > before);
        // All triangle indices still valid after the rewrite.
        for tri in mesh.triangles() {
            for &v in &tri.v {
                assert!((v as usize) < mesh.vertex_count());
            }
        }
    }

    #[test]
    fn test_smoothing_large_angle_merges() {
        let mut mesh = Mesh::new("fold");
        let a = mesh.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        let c = mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        let d = mesh.add_vertex(Vec3::new(0.0, 0.0, 1.0));
        mesh.add_triangle(a, c, b, 0);
        mesh.add_triangle(a, b, d, 0);

        // With a permissive angle the fold smooths instead of splitting.
        mesh.compute_vertex_normals(std::f32::consts::PI).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_orientation_mismatch() {
        // Second face wound backwards: anti-parallel normals at shared
        // vertices.
        let mut mesh = Mesh::new("bad");
        let a = mesh.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Vec3::new(1.0, 1.0, 0.0));
        let d = mesh.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        mesh.add_triangle(a, b, c, 0);
        mesh.add_triangle(a, d, c, 0);

        let err = mesh.compute_vertex_normals(20f32.to_radians());
        assert!(matches!(err, Err(MeshError::OrientationMismatch { .. })));
    }

    #[test]
    fn test_degenerate_triangles_dropped() {
        let mut mesh = Mesh::new("degen");
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);
        let c = mesh.add_vertex(Vec3::Y);

        mesh.add_triangle(a, a, b, 0); // zero area
        mesh.add_triangle(a, b, 99, 0); // bad index
        mesh.add_triangle(a, b, c, 0); // fine

        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_all_or_nothing_normals() {
        let mut mesh = quad_mesh();
        // Adding one explicit normal backfills the other four vertices.
        let v = mesh
            .add_vertex_with_normal(Vec3::new(2.0, 0.0, 0.0), Vec3::Z)
            .unwrap();
        assert_eq!(mesh.normals().unwrap().len(), mesh.vertex_count());
        assert_eq!(v as usize, mesh.vertex_count() - 1);
    }

    #[test]
    fn test_mesh_bbox() {
        let mesh = quad_mesh();
        let bbox = mesh.bbox();
        assert_eq!(bbox.min(), Vec3::ZERO);
        assert_eq!(bbox.max(), Vec3::new(1.0, 1.0, 0.0));
    }
}
