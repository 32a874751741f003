//! Built-in test scenes, selected with a `test:NAME` scene spec.

use std::sync::Arc;

use glint_core::{Color, Envmap, Mesh, MeshError};
use glint_math::Vec3;
use glint_renderer::{Camera, Light, Material, Scene};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("{0}: unknown test scene")]
    UnknownScene(String),

    #[error("scene spec missing (expected test:NAME)")]
    MissingName,

    #[error("{path}: failed to load environment map: {source}")]
    Envmap {
        path: String,
        #[source]
        source: glint_core::EnvmapError,
    },

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error("{0}: scene loaders are not built in; use a test: scene")]
    UnsupportedFormat(String),
}

/// Build the named test scene and its default camera.
///
/// The caller applies background and camera overrides, then calls
/// `build_acceleration`.
pub fn build(name: &str) -> Result<(Scene, Camera), SceneError> {
    match name {
        "sphere" => sphere_scene(),
        "cornell" => cornell_scene(),
        "mirror-box" => mirror_box_scene(),
        "env-sphere" => env_sphere_scene(),
        "occlusion" => occlusion_scene(),
        "gradient" => gradient_scene(),
        "" => Err(SceneError::MissingName),
        other => Err(SceneError::UnknownScene(other.to_string())),
    }
}

/// A single diffuse sphere under one point light.
fn sphere_scene() -> Result<(Scene, Camera), SceneError> {
    let mut scene = Scene::new();
    let white = scene.add_material(Material::lambertian(Color::gray(0.8)));
    scene.add_sphere(Vec3::ZERO, 1.0, white);
    scene.add_light(Light::point(Vec3::new(0.0, 0.0, 5.0), Color::WHITE));

    let mut camera = Camera::new();
    camera.move_to(Vec3::new(0.0, 0.0, 3.0));
    camera.point(Vec3::ZERO);
    Ok((scene, camera))
}

/// Add an axis-aligned quad (two triangles) to a mesh.
fn add_quad(mesh: &mut Mesh, corners: [Vec3; 4], material: u32) {
    let a = mesh.add_vertex(corners[0]);
    let b = mesh.add_vertex(corners[1]);
    let c = mesh.add_vertex(corners[2]);
    let d = mesh.add_vertex(corners[3]);
    mesh.add_triangle(a, b, c, material);
    mesh.add_triangle(a, c, d, material);
}

/// Five white walls, one red, one green, and a ceiling area light.
fn cornell_scene() -> Result<(Scene, Camera), SceneError> {
    let mut scene = Scene::new();
    let white = scene.add_material(Material::lambertian(Color::gray(0.73)));
    let red = scene.add_material(Material::lambertian(Color::new(0.65, 0.05, 0.05)));
    let green = scene.add_material(Material::lambertian(Color::new(0.12, 0.45, 0.15)));

    let mut walls = Mesh::new("walls");
    // Floor (y = -1). Faceted walls shade with the ray-facing side, so
    // winding is free.
    add_quad(
        &mut walls,
        [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
        ],
        white,
    );
    // Ceiling (y = 1).
    add_quad(
        &mut walls,
        [
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
        ],
        white,
    );
    // Back wall (z = -1).
    add_quad(
        &mut walls,
        [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
        ],
        white,
    );
    // Left wall (x = -1), red.
    add_quad(
        &mut walls,
        [
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ],
        red,
    );
    // Right wall (x = 1), green.
    add_quad(
        &mut walls,
        [
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, -1.0),
        ],
        green,
    );
    scene.add_mesh(walls);

    scene.add_area_light(
        Vec3::new(0.0, 0.995, 0.0),
        -Vec3::Y,
        0.4,
        Color::gray(12.0),
    );

    let mut camera = Camera::new();
    camera.move_to(Vec3::new(0.0, 0.0, 2.8));
    camera.point(Vec3::ZERO);
    Ok((scene, camera))
}

/// Two facing mirror planes with a diffuse sphere between them.
fn mirror_box_scene() -> Result<(Scene, Camera), SceneError> {
    let mut scene = Scene::new();
    let mirror = scene.add_material(Material::mirror(Color::gray(0.95)));
    let gray = scene.add_material(Material::lambertian(Color::gray(0.6)));

    scene.add_disc(Vec3::new(-2.0, 0.0, 0.0), Vec3::X, 6.0, mirror);
    scene.add_disc(Vec3::new(2.0, 0.0, 0.0), -Vec3::X, 6.0, mirror);
    scene.add_sphere(Vec3::ZERO, 0.5, gray);
    scene.add_area_light(Vec3::new(0.0, 4.0, 0.0), -Vec3::Y, 1.0, Color::gray(8.0));

    let mut camera = Camera::new();
    camera.move_to(Vec3::new(0.3, 0.6, 5.0));
    camera.point(Vec3::ZERO);
    Ok((scene, camera))
}

/// A diffuse sphere under a constant white sky.
fn env_sphere_scene() -> Result<(Scene, Camera), SceneError> {
    let mut scene = Scene::new();
    let white = scene.add_material(Material::lambertian(Color::gray(0.8)));
    scene.add_sphere(Vec3::ZERO, 1.0, white);
    scene.set_background_map(Arc::new(Envmap::solid(Color::WHITE)));

    let mut camera = Camera::new();
    camera.move_to(Vec3::new(0.0, 0.0, 3.0));
    camera.point(Vec3::ZERO);
    Ok((scene, camera))
}

/// A point light above two stacked opaque planes, with a floor that
/// stays dark if occlusion works.
fn occlusion_scene() -> Result<(Scene, Camera), SceneError> {
    let mut scene = Scene::new();
    let gray = scene.add_material(Material::lambertian(Color::gray(0.5)));
    scene.add_disc(Vec3::new(0.0, 2.0, 0.0), Vec3::Y, 4.0, gray);
    scene.add_disc(Vec3::new(0.0, 1.5, 0.0), Vec3::Y, 4.0, gray);
    scene.add_disc(Vec3::new(0.0, -1.0, 0.0), Vec3::Y, 4.0, gray);
    scene.add_light(Light::point(Vec3::new(0.0, 4.0, 0.0), Color::gray(10.0)));

    let mut camera = Camera::new();
    camera.move_to(Vec3::new(0.0, 0.0, 6.0));
    camera.point(Vec3::new(0.0, -0.5, 0.0));
    Ok((scene, camera))
}

/// A tilted diffuse plane under a far light: a smooth radiance ramp for
/// filter comparisons.
fn gradient_scene() -> Result<(Scene, Camera), SceneError> {
    let mut scene = Scene::new();
    let white = scene.add_material(Material::lambertian(Color::gray(0.9)));
    scene.add_disc(
        Vec3::ZERO,
        Vec3::new(0.0, 0.3, 1.0).normalize(),
        8.0,
        white,
    );
    scene.add_light(Light::far(
        Vec3::new(0.0, 1.0, 0.3).normalize(),
        0.1,
        Color::gray(3.0),
    ));

    let mut camera = Camera::new();
    camera.move_to(Vec3::new(0.0, 1.0, 6.0));
    camera.point(Vec3::ZERO);
    Ok((scene, camera))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_core::{RenderParams, Tint};
    use glint_renderer::{
        render, Filter, IntegratorKind, RenderOptions, Row, RowSink,
    };
    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    struct MemSink {
        rows: Vec<Row>,
    }

    impl RowSink for MemSink {
        fn write_row(&mut self, row: Row) -> std::io::Result<()> {
            self.rows.push(row);
            Ok(())
        }
    }

    /// Render a built-in scene square and return its pixels row-major.
    fn render_scene(
        name: &str,
        size: u32,
        spp: u32,
        kind: IntegratorKind,
        integ_opts: &str,
        filter: Filter,
    ) -> Vec<Tint> {
        let (mut scene, mut camera) = build(name).unwrap();
        scene.build_acceleration();
        camera.set_aspect(1.0);

        let mut integ_params = RenderParams::new();
        integ_params.parse(integ_opts).unwrap();
        let options = RenderOptions::new(size, size, spp);

        let mut sink = MemSink::default();
        let stop = AtomicBool::new(false);
        render(
            &scene,
            &camera,
            kind,
            &integ_params,
            &options,
            filter,
            &mut sink,
            &stop,
        )
        .unwrap();
        sink.rows.into_iter().flat_map(|r| r.pixels).collect()
    }

    #[test]
    fn test_all_scenes_build() {
        for name in [
            "sphere",
            "cornell",
            "mirror-box",
            "env-sphere",
            "occlusion",
            "gradient",
        ] {
            let (mut scene, _) = build(name).unwrap();
            scene.build_acceleration();
            assert!(scene.is_built(), "{name} failed to build");
            assert!(!scene.surfaces().is_empty(), "{name} has no surfaces");
        }
    }

    #[test]
    fn test_unknown_scene() {
        assert!(matches!(build("warehouse"), Err(SceneError::UnknownScene(_))));
        assert!(matches!(build(""), Err(SceneError::MissingName)));
    }

    #[test]
    fn test_cornell_wall_tints() {
        // Path-trace the box and pool the pixels that clearly show the
        // colored side walls; their pooled chromaticity must sit near
        // the wall albedo's chromaticity. The tolerance absorbs Monte
        // Carlo noise and the tint interreflection adds on top of the
        // neutral illumination.
        let pixels = render_scene(
            "cornell",
            36,
            48,
            IntegratorKind::Path,
            "min-path-len=3,rr-term=0.5",
            Filter::Box { radius: 0.5 },
        );

        let mut red_sum = Color::BLACK;
        let mut red_count = 0;
        let mut green_sum = Color::BLACK;
        let mut green_count = 0;
        for px in &pixels {
            let c = px.color;
            if c.is_black() {
                continue;
            }
            if c.r > 2.0 * c.g && c.r > 2.0 * c.b {
                red_sum += c;
                red_count += 1;
            } else if c.g > 2.0 * c.r && c.g > 2.0 * c.b {
                green_sum += c;
                green_count += 1;
            }
        }

        assert!(red_count >= 20, "only {red_count} red-wall pixels");
        assert!(green_count >= 20, "only {green_count} green-wall pixels");

        let share = |c: Color, ch: f32| ch / (c.r + c.g + c.b);
        let red_share = share(red_sum, red_sum.r);
        let green_share = share(green_sum, green_sum.g);
        // Albedo chromaticities: 0.65/0.75 and 0.45/0.72.
        assert!(
            (red_share - 0.65 / 0.75).abs() < 0.035,
            "red wall chromaticity {red_share}"
        );
        assert!(
            (green_share - 0.45 / 0.72).abs() < 0.035,
            "green wall chromaticity {green_share}"
        );
    }

    /// Hann-windowed 2D DFT energy in the high band (either frequency
    /// at or above n/4).
    fn high_band_energy(lum: &[f32], n: usize) -> f64 {
        let window = |i: usize| -> f64 {
            let t = i as f64 / (n - 1) as f64;
            0.5 * (1.0 - (2.0 * std::f64::consts::PI * t).cos())
        };

        // Separable DFT: rows, then columns.
        let mut rows = vec![(0.0f64, 0.0f64); n * n];
        for y in 0..n {
            for kx in 0..n {
                let (mut re, mut im) = (0.0, 0.0);
                for x in 0..n {
                    let v = lum[y * n + x] as f64 * window(x) * window(y);
                    let ang =
                        -2.0 * std::f64::consts::PI * (kx * x) as f64 / n as f64;
                    re += v * ang.cos();
                    im += v * ang.sin();
                }
                rows[y * n + kx] = (re, im);
            }
        }

        let mut total = 0.0;
        for kx in 0..n {
            for ky in 0..n {
                let fx = kx.min(n - kx);
                let fy = ky.min(n - ky);
                if fx.max(fy) < n / 4 {
                    continue;
                }
                let (mut re, mut im) = (0.0, 0.0);
                for y in 0..n {
                    let (r, i) = rows[y * n + kx];
                    let ang =
                        -2.0 * std::f64::consts::PI * (ky * y) as f64 / n as f64;
                    let (c, s) = (ang.cos(), ang.sin());
                    re += r * c - i * s;
                    im += r * s + i * c;
                }
                total += re * re + im * im;
            }
        }
        total
    }

    #[test]
    fn test_gaussian_filter_cuts_high_band() {
        // The same keyed sample set reconstructed two ways: a wide
        // Gaussian must carry less high-frequency energy than a
        // half-pixel box (the disc silhouette and sampling noise are
        // what it smooths away).
        let n = 32;
        let render_lum = |filter: Filter| -> Vec<f32> {
            render_scene(
                "gradient",
                n as u32,
                4,
                IntegratorKind::Direct,
                "light-samples=1",
                filter,
            )
            .iter()
            .map(|px| px.color.luminance())
            .collect()
        };

        let boxed = render_lum(Filter::Box { radius: 0.5 });
        let gauss = render_lum(Filter::Gauss {
            radius: 2.0,
            alpha: 2.0,
        });

        // Both reconstructions conserve the overall signal.
        let mean = |img: &[f32]| img.iter().sum::<f32>() / img.len() as f32;
        let (mb, mg) = (mean(&boxed), mean(&gauss));
        assert!(mb > 0.0);
        assert!((mg - mb).abs() / mb < 0.05, "means {mb} vs {mg}");

        let hb = high_band_energy(&boxed, n);
        let hg = high_band_energy(&gauss, n);
        assert!(hb > 0.0);
        let ratio = hg / hb;
        assert!(ratio < 0.95, "high-band ratio {ratio}");
    }
}
