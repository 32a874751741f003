//! Latitude-longitude environment maps.

use std::f32::consts::PI;
use std::path::Path;

use glint_math::{Vec2, Vec3};
use thiserror::Error;

use crate::Color;

/// Errors that can occur while loading an environment map.
#[derive(Error, Debug)]
pub enum EnvmapError {
    #[error("failed to load environment map: {0}")]
    Load(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decoding error: {0}")]
    Image(#[from] image::ImageError),
}

/// An environment map in latitude-longitude (equirectangular) layout.
///
/// `u` spans longitude (`-pi .. pi`), `v` spans latitude from the +y pole
/// (v = 0) to the -y pole (v = 1).
#[derive(Debug, Clone)]
pub struct Envmap {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Envmap {
    pub fn new(width: u32, height: u32, pixels: Vec<Color>) -> Self {
        assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A constant-radiance map (useful for uniform sky illumination).
    pub fn solid(color: Color) -> Self {
        Self::new(4, 2, vec![color; 8])
    }

    /// Load an equirectangular map from an image file.
    pub fn load(path: &Path) -> Result<Self, EnvmapError> {
        let img = image::open(path)?.into_rgb32f();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(EnvmapError::Load(format!(
                "{}: empty image",
                path.display()
            )));
        }

        let pixels = img
            .pixels()
            .map(|p| Color::new(p.0[0], p.0[1], p.0[2]))
            .collect();
        Ok(Self::new(width, height, pixels))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// One row of pixels, top row first.
    pub fn row(&self, y: u32) -> &[Color] {
        let start = (y * self.width) as usize;
        &self.pixels[start..start + self.width as usize]
    }

    /// Radiance arriving from world direction `dir`.
    pub fn radiance(&self, dir: Vec3) -> Color {
        let uv = Self::dir_to_uv(dir);
        let x = ((uv.x * self.width as f32) as u32).min(self.width - 1);
        let y = ((uv.y * self.height as f32) as u32).min(self.height - 1);
        self.pixels[(y * self.width + x) as usize]
    }

    /// Map a direction to `[0,1)^2` texture coordinates.
    pub fn dir_to_uv(dir: Vec3) -> Vec2 {
        let d = dir.normalize_or_zero();
        let phi = d.z.atan2(d.x);
        let theta = d.y.clamp(-1.0, 1.0).acos();
        Vec2::new(
            (phi / (2.0 * PI) + 0.5).clamp(0.0, 1.0 - f32::EPSILON),
            (theta / PI).clamp(0.0, 1.0 - f32::EPSILON),
        )
    }

    /// Map `[0,1)^2` texture coordinates back to a world direction.
    pub fn uv_to_dir(uv: Vec2) -> Vec3 {
        let phi = (uv.x - 0.5) * 2.0 * PI;
        let theta = uv.y * PI;
        let sin_theta = theta.sin();
        Vec3::new(sin_theta * phi.cos(), theta.cos(), sin_theta * phi.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_map() {
        let map = Envmap::solid(Color::gray(0.5));
        for dir in [Vec3::X, Vec3::Y, -Vec3::Z, Vec3::new(1.0, -2.0, 0.5)] {
            assert_eq!(map.radiance(dir), Color::gray(0.5));
        }
    }

    #[test]
    fn test_uv_round_trip() {
        for dir in [
            Vec3::new(1.0, 0.2, 0.3).normalize(),
            Vec3::new(-0.5, 0.9, -0.1).normalize(),
            Vec3::new(0.0, -1.0, 0.001).normalize(),
        ] {
            let uv = Envmap::dir_to_uv(dir);
            let back = Envmap::uv_to_dir(uv);
            assert!(
                (back - dir).length() < 1e-3,
                "{dir:?} -> {uv:?} -> {back:?}"
            );
        }
    }

    #[test]
    fn test_poles_map_to_row_extremes() {
        let up = Envmap::dir_to_uv(Vec3::Y);
        let down = Envmap::dir_to_uv(-Vec3::Y);
        assert!(up.y < 1e-6);
        assert!(down.y > 1.0 - 1e-3);
    }
}
