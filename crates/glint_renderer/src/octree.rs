//! Octree spatial acceleration structure.
//!
//! Built by recursive midpoint subdivision of a cubic root volume. A
//! surface descends into a child only when its bounding box fits wholly
//! inside that child's volume, so no surface is ever duplicated across
//! cells; everything else stays on the current node's list.

use glint_core::{Color, Mesh};
use glint_math::{Aabb, Ray, Vec3};

use crate::context::IsecStats;
use crate::material::{Material, ShadowKind};
use crate::surface::{Hit, Surface};

/// Nodes stop splitting below this depth.
const MAX_DEPTH: u32 = 16;

/// Result of an occlusion query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Occlusion {
    /// Some surface completely blocks the ray.
    Full,
    /// Nothing opaque in the way; the color is the residual
    /// transmittance through any partial occluders (WHITE = clear).
    Clear(Color),
}

/// The intersection an occlusion query originates from, for the
/// smoothing-group shadow policy: an occluder in the same group whose
/// face-sidedness differs from the origin's casts no shadow.
#[derive(Debug, Clone, Copy)]
pub struct ShadowOrigin {
    pub smoothing_group: Option<u32>,
    pub back: bool,
}

impl ShadowOrigin {
    pub fn from_hit(hit: &Hit) -> Self {
        Self {
            smoothing_group: hit.smoothing_group,
            back: hit.back,
        }
    }
}

struct Node {
    bbox: Aabb,
    /// Surfaces whose bounds straddle this node's midplanes.
    surfaces: Vec<u32>,
    children: [Option<Box<Node>>; 8],
}

impl Node {
    fn new(bbox: Aabb) -> Self {
        Self {
            bbox,
            surfaces: Vec::new(),
            children: Default::default(),
        }
    }

    /// The bounding box of child octant `i` (bit 0 = +x half, bit 1 =
    /// +y half, bit 2 = +z half).
    fn child_bbox(&self, i: usize) -> Aabb {
        let mid = self.bbox.centroid();
        let (min, max) = (self.bbox.min(), self.bbox.max());
        let pick = |bit: usize, lo: f32, mi: f32, hi: f32| -> (f32, f32) {
            if i & bit != 0 {
                (mi, hi)
            } else {
                (lo, mi)
            }
        };
        let (x0, x1) = pick(1, min.x, mid.x, max.x);
        let (y0, y1) = pick(2, min.y, mid.y, max.y);
        let (z0, z1) = pick(4, min.z, mid.z, max.z);
        Aabb::from_points(Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1))
    }

    fn insert(&mut self, index: u32, bbox: &Aabb, depth: u32) {
        if depth < MAX_DEPTH {
            let mid = self.bbox.centroid();
            // A surface descends only if it avoids all three midplanes.
            let octant = octant_of(bbox, mid);
            if let Some(i) = octant {
                if self.children[i].is_none() {
                    let child_bbox = self.child_bbox(i);
                    self.children[i] = Some(Box::new(Node::new(child_bbox)));
                }
                self.children[i]
                    .as_mut()
                    .unwrap()
                    .insert(index, bbox, depth + 1);
                return;
            }
        }
        self.surfaces.push(index);
    }
}

/// The child octant wholly containing `bbox`, or None if it straddles a
/// midplane through `mid`.
fn octant_of(bbox: &Aabb, mid: Vec3) -> Option<usize> {
    let side = |lo: f32, hi: f32, m: f32| -> Option<usize> {
        if hi <= m {
            Some(0)
        } else if lo >= m {
            Some(1)
        } else {
            None
        }
    };
    let x = side(bbox.x.min, bbox.x.max, mid.x)?;
    let y = side(bbox.y.min, bbox.y.max, mid.y)?;
    let z = side(bbox.z.min, bbox.z.max, mid.z)?;
    Some(x | (y << 1) | (z << 2))
}

pub struct Octree {
    root: Option<Node>,
    bounds: Aabb,
}

impl Octree {
    /// Build an octree over the given surface array.
    pub fn build(surfaces: &[Surface], meshes: &[Mesh]) -> Self {
        let mut scene_bbox = Aabb::EMPTY;
        let bboxes: Vec<Aabb> = surfaces.iter().map(|s| s.bbox(meshes)).collect();
        for bbox in &bboxes {
            scene_bbox = Aabb::surrounding(&scene_bbox, bbox);
        }

        if surfaces.is_empty() {
            return Self {
                root: None,
                bounds: Aabb::EMPTY,
            };
        }

        // Cubic root so midpoint subdivision yields cubic cells.
        let bounds = scene_bbox.cube();
        let mut root = Node::new(bounds);
        for (i, bbox) in bboxes.iter().enumerate() {
            root.insert(i as u32, bbox, 0);
        }

        Self {
            root: Some(root),
            bounds,
        }
    }

    /// World bounds of the scene contents (the cubic root volume).
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Closest-hit query. Narrows `ray` to the closest intersection and
    /// returns its record, or None if the ray hits nothing.
    pub fn intersect(
        &self,
        ray: &mut Ray,
        surfaces: &[Surface],
        meshes: &[Mesh],
        stats: &mut IsecStats,
    ) -> Option<Hit> {
        let root = self.root.as_ref()?;
        root.bbox.entry_distance(ray, ray.span())?;
        node_intersect(root, ray, surfaces, meshes, stats)
    }

    /// Occlusion query over the ray's full interval.
    ///
    /// Short-circuits on the first opaque occluder; partial occluders
    /// multiply into the residual transmittance instead.
    pub fn occludes(
        &self,
        ray: &Ray,
        origin: Option<&ShadowOrigin>,
        surfaces: &[Surface],
        meshes: &[Mesh],
        materials: &[Material],
        stats: &mut IsecStats,
    ) -> Occlusion {
        let mut transmittance = Color::WHITE;
        match self.root.as_ref() {
            Some(root)
                if node_occludes(
                    root,
                    ray,
                    origin,
                    surfaces,
                    meshes,
                    materials,
                    &mut transmittance,
                    stats,
                ) =>
            {
                Occlusion::Full
            }
            _ => Occlusion::Clear(transmittance),
        }
    }
}

fn node_intersect(
    node: &Node,
    ray: &mut Ray,
    surfaces: &[Surface],
    meshes: &[Mesh],
    stats: &mut IsecStats,
) -> Option<Hit> {
    stats.node_visits += 1;

    let mut best = None;
    for &si in &node.surfaces {
        stats.surf_tests += 1;
        if let Some(hit) = surfaces[si as usize].intersect(ray, meshes, si) {
            stats.surf_hits += 1;
            best = Some(hit);
        }
    }

    // Visit children front-to-back; a hit in a nearer child narrows the
    // ray and prunes the rest by entry distance.
    let mut order: [(f32, u8); 8] = [(0.0, 0); 8];
    let mut n = 0;
    for (i, child) in node.children.iter().enumerate() {
        if let Some(child) = child {
            if let Some(entry) = child.bbox.entry_distance(ray, ray.span()) {
                order[n] = (entry, i as u8);
                n += 1;
            }
        }
    }
    order[..n].sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

    for &(entry, i) in &order[..n] {
        if entry >= ray.t1 {
            continue;
        }
        let child = node.children[i as usize].as_ref().unwrap();
        if let Some(hit) = node_intersect(child, ray, surfaces, meshes, stats) {
            best = Some(hit);
        }
    }

    best
}

#[allow(clippy::too_many_arguments)]
fn node_occludes(
    node: &Node,
    ray: &Ray,
    origin: Option<&ShadowOrigin>,
    surfaces: &[Surface],
    meshes: &[Mesh],
    materials: &[Material],
    transmittance: &mut Color,
    stats: &mut IsecStats,
) -> bool {
    stats.node_visits += 1;

    for &si in &node.surfaces {
        let surface = &surfaces[si as usize];
        let material = &materials[surface.material(meshes) as usize];
        let kind = material.shadow_kind();
        if kind == ShadowKind::None {
            continue;
        }

        stats.surf_tests += 1;
        let Some(any) = surface.intersects(ray, meshes) else {
            continue;
        };
        stats.surf_hits += 1;

        // Mutual back-face shadow suppression within a smoothing group.
        if let (Some(origin), Some(group)) =
            (origin, surface.smoothing_group(meshes))
        {
            if origin.smoothing_group == Some(group) && origin.back != any.back {
                continue;
            }
        }

        match kind {
            ShadowKind::Opaque => return true,
            ShadowKind::Partial => *transmittance *= material.transmittance(),
            ShadowKind::None => unreachable!(),
        }
    }

    for child in node.children.iter().flatten() {
        if child.bbox.hit(ray, ray.span())
            && node_occludes(
                child,
                ray,
                origin,
                surfaces,
                meshes,
                materials,
                transmittance,
                stats,
            )
        {
            return true;
        }
    }

    false
}
