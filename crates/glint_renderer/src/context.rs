//! Per-thread render state and global statistics.

use glint_core::RenderParams;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::media::{MediaStack, Medium};
use crate::sampler::{deep_seed, pixel_seed, SampleLayout, SampleSet};
use crate::scene::Scene;

/// Fixed knobs for one render, resolved from the CLI's
/// `--render-options` table and defaults.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    /// Self-intersection offset for secondary rays.
    pub min_trace: f32,
    pub tile_size: u32,
    /// Single-threaded row-by-row rendering.
    pub by_rows: bool,
    /// Worker count; 0 means one per core.
    pub threads: usize,
    /// Base seed for all per-pixel randomness.
    pub seed: u64,
    /// Estimate one uniformly-chosen light per sample instead of
    /// enumerating all of them.
    pub single_light: bool,
}

impl RenderOptions {
    pub fn new(width: u32, height: u32, samples_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            samples_per_pixel,
            min_trace: 1e-4,
            tile_size: 16,
            by_rows: false,
            threads: 0,
            seed: 0,
            single_light: false,
        }
    }

    /// Apply `--render-options` values on top of the defaults.
    pub fn apply_params(mut self, params: &RenderParams) -> Self {
        self.min_trace = params.get_float("min-trace", self.min_trace);
        self.tile_size = params.get_uint("tile-size", self.tile_size).max(1);
        self.by_rows = params.get_bool("render-by-rows", self.by_rows);
        self.seed = params.get_uint("seed", self.seed as u32) as u64;
        self.single_light = params.get_bool("single-light", self.single_light);
        self
    }
}

/// Counters from acceleration-structure traversal.
#[derive(Debug, Default, Clone, Copy)]
pub struct IsecStats {
    pub node_visits: u64,
    pub surf_tests: u64,
    pub surf_hits: u64,
}

impl IsecStats {
    pub fn merge(&mut self, other: &IsecStats) {
        self.node_visits += other.node_visits;
        self.surf_tests += other.surf_tests;
        self.surf_hits += other.surf_hits;
    }
}

/// Render-wide statistics, accumulated per thread and merged on
/// completion.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderStats {
    pub camera_rays: u64,
    pub closest_queries: u64,
    pub shadow_queries: u64,
    pub isec: IsecStats,
}

impl RenderStats {
    pub fn merge(&mut self, other: &RenderStats) {
        self.camera_rays += other.camera_rays;
        self.closest_queries += other.closest_queries;
        self.shadow_queries += other.shadow_queries;
        self.isec.merge(&other.isec);
    }
}

/// Mutable state owned by one worker thread.
///
/// The scene itself is shared immutably; everything a sample mutates
/// (stratified samples, the deep-path RNG, the media stack, counters)
/// lives here, and the reusable buffers are reset at each top-level
/// camera ray.
pub struct RenderContext<'a> {
    pub scene: &'a Scene,
    pub options: &'a RenderOptions,
    pub samples: SampleSet,
    /// Uniform generator for draws past the stratified budget; reseeded
    /// per camera ray so output is independent of scheduling.
    pub rng: Xoshiro256PlusPlus,
    pub media: MediaStack,
    pub stats: RenderStats,
}

impl<'a> RenderContext<'a> {
    pub fn new(scene: &'a Scene, options: &'a RenderOptions, layout: &SampleLayout) -> Self {
        Self {
            scene,
            options,
            samples: SampleSet::new(layout, options.samples_per_pixel),
            rng: Xoshiro256PlusPlus::seed_from_u64(0),
            media: MediaStack::new(Medium::AIR),
            stats: RenderStats::default(),
        }
    }

    /// Generate this pixel's stratified samples.
    pub fn start_pixel(&mut self, px: u32, py: u32) {
        self.samples.generate(pixel_seed(self.options.seed, px, py));
    }

    /// Reset per-ray state before tracing camera sample `s` of a pixel.
    pub fn start_camera_ray(&mut self, px: u32, py: u32, s: u32) {
        self.rng = Xoshiro256PlusPlus::seed_from_u64(deep_seed(self.options.seed, px, py, s));
        self.media.reset(Medium::AIR);
        self.stats.camera_rays += 1;
    }
}
