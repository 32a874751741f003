//! The renderable scene: owning container of geometry, materials and
//! lights, plus the acceleration structure built over them.

use std::sync::Arc;

use glint_core::{Color, Envmap, Mesh};
use glint_math::{Ray, Vec3};

use crate::context::RenderStats;
use crate::disc::Disc;
use crate::light::Light;
use crate::material::Material;
use crate::octree::{Occlusion, Octree, ShadowOrigin};
use crate::sphere::Sphere;
use crate::surface::{Hit, Surface};
use crate::triangle::MeshTri;

/// What a ray sees when it leaves the scene.
#[derive(Debug, Clone)]
pub enum Background {
    Solid(Color),
    Map(Arc<Envmap>),
}

pub struct Scene {
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    surfaces: Vec<Surface>,
    lights: Vec<Light>,
    background: Background,
    bg_alpha: f32,
    /// Optional override map used for illumination instead of the
    /// visible background.
    light_map: Option<Arc<Envmap>>,
    octree: Option<Octree>,
    center: Vec3,
    radius: f32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            materials: Vec::new(),
            surfaces: Vec::new(),
            lights: Vec::new(),
            background: Background::Solid(Color::BLACK),
            bg_alpha: 1.0,
            light_map: None,
            octree: None,
            center: Vec3::ZERO,
            radius: 1.0,
        }
    }

    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> u32 {
        assert!(self.octree.is_none(), "scene already built");
        self.meshes.push(mesh);
        (self.meshes.len() - 1) as u32
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32, material: u32) {
        assert!(self.octree.is_none(), "scene already built");
        self.surfaces
            .push(Surface::Sphere(Sphere::new(center, radius, material)));
    }

    pub fn add_disc(&mut self, center: Vec3, normal: Vec3, radius: f32, material: u32) {
        assert!(self.octree.is_none(), "scene already built");
        self.surfaces
            .push(Surface::Disc(Disc::new(center, normal, radius, material)));
    }

    pub fn add_light(&mut self, light: Light) -> u32 {
        self.lights.push(light);
        (self.lights.len() - 1) as u32
    }

    /// Add a disc area light together with its emitting geometry, linked
    /// both ways so BSDF samples striking the disc can recover the
    /// light's sampling density.
    pub fn add_area_light(
        &mut self,
        center: Vec3,
        normal: Vec3,
        radius: f32,
        radiance: Color,
    ) -> u32 {
        let index = self.add_light(Light::area(center, normal, radius, radiance));
        let mut material = Material::emitter(radiance);
        material.link_light(index);
        let material = self.add_material(material);
        self.add_disc(center, normal, radius, material);
        index
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background = Background::Solid(color);
    }

    pub fn set_background_map(&mut self, map: Arc<Envmap>) {
        self.background = Background::Map(map);
    }

    pub fn set_bg_alpha(&mut self, alpha: f32) {
        self.bg_alpha = alpha.clamp(0.0, 1.0);
    }

    /// Use a separate (typically lower-resolution) map for illumination.
    pub fn set_light_map(&mut self, map: Arc<Envmap>) {
        self.light_map = Some(map);
    }

    /// Build the acceleration structure. Must be called exactly once,
    /// after all surfaces are added; the scene is read-only afterwards.
    pub fn build_acceleration(&mut self) {
        if self.octree.is_some() {
            log::warn!("build_acceleration called more than once, ignored");
            return;
        }

        // Expand meshes into per-triangle surfaces.
        for (mi, mesh) in self.meshes.iter().enumerate() {
            for ti in 0..mesh.triangle_count() {
                self.surfaces.push(Surface::Tri(MeshTri {
                    mesh: mi as u32,
                    tri: ti as u32,
                }));
            }
        }

        let octree = Octree::build(&self.surfaces, &self.meshes);
        if self.surfaces.is_empty() {
            self.center = Vec3::ZERO;
            self.radius = 1.0;
        } else {
            let (center, radius) = octree.bounds().bounding_sphere();
            self.center = center;
            self.radius = radius.max(f32::MIN_POSITIVE);
        }
        self.octree = Some(octree);

        // An environment light for the illumination map, unless the
        // scene already carries one.
        let illum_map = self.light_map.clone().or(match &self.background {
            Background::Map(map) => Some(map.clone()),
            Background::Solid(_) => None,
        });
        if let Some(map) = illum_map {
            if !self
                .lights
                .iter()
                .any(|l| matches!(l, Light::Environ { .. }))
            {
                self.lights.push(Light::environ(map));
            }
        }

        let (center, radius) = (self.center, self.radius);
        for light in &mut self.lights {
            light.scene_setup(center, radius);
        }

        log::debug!(
            "scene built: {} surfaces, {} lights, bounding radius {}",
            self.surfaces.len(),
            self.lights.len(),
            self.radius
        );
    }

    pub fn is_built(&self) -> bool {
        self.octree.is_some()
    }

    /// Closest-hit query; narrows `ray` to the hit.
    pub fn intersect(&self, ray: &mut Ray, stats: &mut RenderStats) -> Option<Hit> {
        stats.closest_queries += 1;
        self.octree
            .as_ref()
            .expect("scene not built")
            .intersect(ray, &self.surfaces, &self.meshes, &mut stats.isec)
    }

    /// Occlusion query over the ray's interval.
    pub fn occludes(
        &self,
        ray: &Ray,
        origin: Option<&ShadowOrigin>,
        stats: &mut RenderStats,
    ) -> Occlusion {
        stats.shadow_queries += 1;
        self.octree.as_ref().expect("scene not built").occludes(
            ray,
            origin,
            &self.surfaces,
            &self.meshes,
            &self.materials,
            &mut stats.isec,
        )
    }

    /// Radiance seen by a ray that escapes the scene.
    pub fn background_radiance(&self, dir: Vec3) -> Color {
        match &self.background {
            Background::Solid(color) => *color,
            Background::Map(map) => map.radiance(dir),
        }
    }

    pub fn bg_alpha(&self) -> f32 {
        self.bg_alpha
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// The scene's bounding sphere, valid after build.
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        (self.center, self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_query() {
        let mut scene = Scene::new();
        let white = scene.add_material(Material::lambertian(Color::gray(0.8)));
        scene.add_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, white);
        scene.build_acceleration();

        let mut stats = RenderStats::default();
        let mut ray = Ray::new(Vec3::ZERO, -Vec3::Z, 1e-3, f32::INFINITY);
        let hit = scene.intersect(&mut ray, &mut stats).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-4);
        assert_eq!(stats.closest_queries, 1);
    }

    #[test]
    fn test_mesh_expansion() {
        let mut scene = Scene::new();
        let mat = scene.add_material(Material::lambertian(Color::WHITE));

        let mut mesh = Mesh::new("quad");
        let a = mesh.add_vertex(Vec3::new(-1.0, -1.0, -2.0));
        let b = mesh.add_vertex(Vec3::new(1.0, -1.0, -2.0));
        let c = mesh.add_vertex(Vec3::new(1.0, 1.0, -2.0));
        let d = mesh.add_vertex(Vec3::new(-1.0, 1.0, -2.0));
        mesh.add_triangle(a, b, c, mat);
        mesh.add_triangle(a, c, d, mat);
        scene.add_mesh(mesh);
        scene.build_acceleration();

        assert_eq!(scene.surfaces().len(), 2);
        let mut stats = RenderStats::default();
        let mut ray = Ray::new(Vec3::ZERO, -Vec3::Z, 1e-3, f32::INFINITY);
        assert!(scene.intersect(&mut ray, &mut stats).is_some());
    }

    #[test]
    fn test_area_light_linkage() {
        let mut scene = Scene::new();
        let li = scene.add_area_light(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y, 0.5, Color::WHITE);
        scene.build_acceleration();

        // The emitting disc is in the scene and its material links back
        // to the light.
        assert_eq!(scene.surfaces().len(), 1);
        let mat = scene.surfaces()[0].material(scene.meshes());
        assert_eq!(scene.materials()[mat as usize].emitter_light(), Some(li));
    }

    #[test]
    fn test_background_map_becomes_light() {
        let mut scene = Scene::new();
        let mat = scene.add_material(Material::lambertian(Color::WHITE));
        scene.add_sphere(Vec3::ZERO, 1.0, mat);
        scene.set_background_map(Arc::new(Envmap::solid(Color::gray(0.5))));
        scene.build_acceleration();

        assert_eq!(scene.lights().len(), 1);
        assert!(scene.lights()[0].is_environ());
        assert_eq!(scene.background_radiance(Vec3::X), Color::gray(0.5));
    }
}
