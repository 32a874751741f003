//! The filtered sample accumulator and the row-output contract.
//!
//! Each radiance sample is splatted into every pixel within the
//! reconstruction filter's radius, weighted by the kernel at the
//! sub-pixel offset. Pixels store running `(sum w*L, sum w*alpha,
//! sum w)` triples; resolving divides out the weight.

use glint_core::{Color, Tint};

use crate::filter::Filter;

/// One finished image row, handed to the encoder in order.
#[derive(Debug, Clone)]
pub struct Row {
    pub x0: u32,
    pub y: u32,
    pub pixels: Vec<Tint>,
}

/// The encoder side of the output boundary. Implementations map rows to
/// an image file; rows arrive exactly once, in top-to-bottom order.
pub trait RowSink {
    fn write_row(&mut self, row: Row) -> std::io::Result<()>;

    /// Finish the image (flush and close the file).
    fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accum {
    color: Color,
    alpha: f32,
    weight: f32,
}

impl Accum {
    fn add(&mut self, other: &Accum) {
        self.color += other.color;
        self.alpha += other.alpha;
        self.weight += other.weight;
    }

    fn resolve(&self) -> Tint {
        if self.weight <= 0.0 {
            return Tint::new(Color::BLACK, 0.0);
        }
        Tint::new(
            (self.color / self.weight).max_zero(),
            (self.alpha / self.weight).clamp(0.0, 1.0),
        )
    }
}

/// A splat buffer over a pixel rectangle. Tiles render into private
/// buffers sized to their footprint (tile extent plus filter radius);
/// the whole-image accumulator merges them.
pub struct FilteredAccum {
    filter: Filter,
    /// Rectangle origin in image coordinates (clipped to the image).
    x0: u32,
    y0: u32,
    width: u32,
    height: u32,
    data: Vec<Accum>,
}

impl FilteredAccum {
    /// An accumulator covering the whole image.
    pub fn new(width: u32, height: u32, filter: Filter) -> Self {
        Self::for_region(0, 0, width, height, filter)
    }

    /// An accumulator covering the given pixel rectangle.
    pub fn for_region(x0: u32, y0: u32, width: u32, height: u32, filter: Filter) -> Self {
        Self {
            filter,
            x0,
            y0,
            width,
            height,
            data: vec![Accum::default(); (width * height) as usize],
        }
    }

    /// The footprint a tile's splats cover: the tile rectangle expanded
    /// by the filter radius, clipped to the image.
    pub fn tile_footprint(
        tile_x: u32,
        tile_y: u32,
        tile_w: u32,
        tile_h: u32,
        filter: &Filter,
        image_w: u32,
        image_h: u32,
    ) -> (u32, u32, u32, u32) {
        let margin = filter.radius().ceil() as u32;
        let x0 = tile_x.saturating_sub(margin);
        let y0 = tile_y.saturating_sub(margin);
        let x1 = (tile_x + tile_w + margin).min(image_w);
        let y1 = (tile_y + tile_h + margin).min(image_h);
        (x0, y0, x1 - x0, y1 - y0)
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Splat one sample at continuous image position `(fx, fy)`.
    ///
    /// Non-finite samples are dropped: a numerical failure costs one
    /// sample, not the render.
    pub fn splat(&mut self, fx: f32, fy: f32, value: Tint) {
        if !value.color.is_finite() || !value.alpha.is_finite() {
            log::debug!("dropping non-finite sample at ({fx}, {fy})");
            return;
        }

        let radius = self.filter.radius();
        // Pixels whose center (px + 0.5) lies within radius of the
        // sample.
        let lo_x = (fx - 0.5 - radius).ceil().max(self.x0 as f32) as u32;
        let hi_x = ((fx - 0.5 + radius).floor() as i64).min((self.x0 + self.width) as i64 - 1);
        let lo_y = (fy - 0.5 - radius).ceil().max(self.y0 as f32) as u32;
        let hi_y = ((fy - 0.5 + radius).floor() as i64).min((self.y0 + self.height) as i64 - 1);

        for py in lo_y as i64..=hi_y {
            for px in lo_x as i64..=hi_x {
                let dx = (px as f32 + 0.5) - fx;
                let dy = (py as f32 + 0.5) - fy;
                let w = self.filter.eval(dx, dy);
                if w == 0.0 {
                    continue;
                }
                let cell = &mut self.data
                    [((py as u32 - self.y0) * self.width + (px as u32 - self.x0)) as usize];
                cell.add(&Accum {
                    color: value.color * w,
                    alpha: value.alpha * w,
                    weight: w,
                });
            }
        }
    }

    /// Merge another (overlapping) accumulator into this one. Sums
    /// commute, so merge order only affects floating-point rounding.
    pub fn merge(&mut self, other: &FilteredAccum) {
        for oy in 0..other.height {
            let y = other.y0 + oy;
            if y < self.y0 || y >= self.y0 + self.height {
                continue;
            }
            for ox in 0..other.width {
                let x = other.x0 + ox;
                if x < self.x0 || x >= self.x0 + self.width {
                    continue;
                }
                let src = &other.data[(oy * other.width + ox) as usize];
                self.data[((y - self.y0) * self.width + (x - self.x0)) as usize].add(src);
            }
        }
    }

    /// Resolve one image row to final pixels.
    pub fn resolve_row(&self, y: u32) -> Row {
        debug_assert!(y >= self.y0 && y < self.y0 + self.height);
        let row = y - self.y0;
        Row {
            x0: self.x0,
            y,
            pixels: (0..self.width)
                .map(|x| self.data[(row * self.width + x) as usize].resolve())
                .collect(),
        }
    }
}
