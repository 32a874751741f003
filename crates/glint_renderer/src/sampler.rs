//! Stratified sample generation.
//!
//! Consumers register labeled channels up front (one per distinct random
//! decision), then each pixel generates a fresh set of values for every
//! channel. Within one channel the draws for a pixel are stratified and
//! shuffled; different channels and different pixels are independent.
//! All randomness is keyed by pixel coordinates, so output is identical
//! regardless of how pixels are distributed over worker threads.

use glint_math::Vec2;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Handle to a registered 1D channel.
#[derive(Debug, Clone, Copy)]
pub struct Channel1d {
    offset: u32,
    count: u32,
}

/// Handle to a registered 2D channel.
#[derive(Debug, Clone, Copy)]
pub struct Channel2d {
    offset: u32,
    count: u32,
}

/// The set of channels a render pass draws from, fixed before rendering
/// starts.
#[derive(Debug, Clone, Default)]
pub struct SampleLayout {
    counts_1d: Vec<u32>,
    counts_2d: Vec<u32>,
}

impl SampleLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel of `count` 1D values per camera sample.
    pub fn add_channel_1d(&mut self, count: u32) -> Channel1d {
        let ch = Channel1d {
            offset: self.counts_1d.iter().sum(),
            count,
        };
        self.counts_1d.push(count);
        ch
    }

    /// Register a channel of `count` 2D values per camera sample.
    pub fn add_channel_2d(&mut self, count: u32) -> Channel2d {
        let ch = Channel2d {
            offset: self.counts_2d.iter().sum(),
            count,
        };
        self.counts_2d.push(count);
        ch
    }

    fn len_1d(&self) -> u32 {
        self.counts_1d.iter().sum()
    }

    fn len_2d(&self) -> u32 {
        self.counts_2d.iter().sum()
    }
}

/// One pixel's worth of samples for every registered channel.
pub struct SampleSet {
    spp: u32,
    counts_1d: Vec<u32>,
    counts_2d: Vec<u32>,
    data_1d: Vec<f32>,
    data_2d: Vec<Vec2>,
}

impl SampleSet {
    pub fn new(layout: &SampleLayout, spp: u32) -> Self {
        Self {
            spp,
            counts_1d: layout.counts_1d.clone(),
            counts_2d: layout.counts_2d.clone(),
            data_1d: vec![0.0; (layout.len_1d() * spp) as usize],
            data_2d: vec![Vec2::ZERO; (layout.len_2d() * spp) as usize],
        }
    }

    pub fn spp(&self) -> u32 {
        self.spp
    }

    /// Regenerate every channel from `seed` (normally [`pixel_seed`]).
    ///
    /// Each channel's `count * spp` draws are jittered over equal strata
    /// and shuffled; 2D channels stratify each dimension separately and
    /// pair them by a random permutation (N-rooks).
    pub fn generate(&mut self, seed: u64) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        let spp = self.spp as usize;
        let mut offset = 0;
        for &count in &self.counts_1d {
            let n = count as usize * spp;
            let block = &mut self.data_1d[offset..offset + n];
            for (k, v) in block.iter_mut().enumerate() {
                *v = (k as f32 + rng.gen::<f32>()) / n as f32;
            }
            shuffle(block, &mut rng);
            offset += n;
        }

        let mut offset = 0;
        for &count in &self.counts_2d {
            let n = count as usize * spp;
            let block = &mut self.data_2d[offset..offset + n];
            for (k, v) in block.iter_mut().enumerate() {
                v.x = (k as f32 + rng.gen::<f32>()) / n as f32;
            }
            // Independent stratification of the second dimension.
            let mut ys: Vec<f32> = (0..n)
                .map(|k| (k as f32 + rng.gen::<f32>()) / n as f32)
                .collect();
            shuffle(&mut ys, &mut rng);
            for (v, y) in block.iter_mut().zip(ys) {
                v.y = y;
            }
            shuffle(block, &mut rng);
        }
    }

    /// The `i`-th draw of a channel for camera sample `s`.
    pub fn get_1d(&self, ch: Channel1d, s: u32, i: u32) -> f32 {
        debug_assert!(i < ch.count && s < self.spp);
        self.data_1d[(ch.offset * self.spp + s * ch.count + i) as usize]
    }

    pub fn get_2d(&self, ch: Channel2d, s: u32, i: u32) -> Vec2 {
        debug_assert!(i < ch.count && s < self.spp);
        self.data_2d[(ch.offset * self.spp + s * ch.count + i) as usize]
    }
}

/// Fisher-Yates shuffle.
fn shuffle<T>(items: &mut [T], rng: &mut Xoshiro256PlusPlus) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Deterministic per-pixel seed: a splitmix64-style mix of the render
/// seed and the pixel coordinates. Never derived from a global counter,
/// so results are independent of work distribution.
pub fn pixel_seed(seed: u64, px: u32, py: u32) -> u64 {
    mix(seed ^ ((px as u64) << 32 | py as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15))
}

/// Seed for unstratified draws deep in a path (beyond the pre-allocated
/// channel budget), keyed by pixel and camera-sample index.
pub fn deep_seed(seed: u64, px: u32, py: u32, s: u32) -> u64 {
    mix(pixel_seed(seed, px, py) ^ mix(0x5bf0_3635 ^ s as u64))
}

fn mix(mut h: u64) -> u64 {
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^ (h >> 31)
}
