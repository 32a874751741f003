//! The render loop: tile scheduling, worker threads, and in-order row
//! delivery to the output sink.
//!
//! The image is cut into fixed-size tiles enqueued on a rayon pool; each
//! worker renders a tile to completion into a private splat buffer.
//! Because tile footprints overlap by the filter radius, tiles are
//! merged into the whole-image accumulator strictly in tile-index
//! order, which makes the output bit-identical for any worker count. A
//! per-row counter of outstanding tiles decides when a row is settled
//! and can be flushed to the encoder.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use glint_core::RenderParams;
use thiserror::Error;

use crate::accum::{FilteredAccum, RowSink};
use crate::camera::Camera;
use crate::context::{RenderContext, RenderOptions, RenderStats};
use crate::filter::Filter;
use crate::integrator::{Integrator, IntegratorKind};
use crate::sampler::{Channel2d, SampleLayout};
use crate::scene::Scene;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("thread pool error: {0}")]
    Pool(String),
}

/// How a render ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Complete,
    /// The stop flag was raised; rows settled before the cancellation
    /// were flushed.
    Cancelled { rows_written: u32 },
}

#[derive(Debug, Clone, Copy)]
struct Tile {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

fn make_tiles(width: u32, height: u32, tile_size: u32) -> Vec<Tile> {
    let mut tiles = Vec::new();
    let mut y = 0;
    while y < height {
        let h = tile_size.min(height - y);
        let mut x = 0;
        while x < width {
            let w = tile_size.min(width - x);
            tiles.push(Tile { x, y, w, h });
            x += tile_size;
        }
        y += tile_size;
    }
    tiles
}

struct TileResult {
    index: usize,
    /// None if the worker saw the stop flag and skipped the tile.
    splat: Option<FilteredAccum>,
    stats: RenderStats,
}

/// Render `scene` through `camera` and stream finished rows to `sink`.
///
/// `stop` is polled between tiles; raising it cancels the render
/// cooperatively.
#[allow(clippy::too_many_arguments)]
pub fn render(
    scene: &Scene,
    camera: &Camera,
    kind: IntegratorKind,
    integ_params: &RenderParams,
    options: &RenderOptions,
    filter: Filter,
    sink: &mut dyn RowSink,
    stop: &AtomicBool,
) -> Result<(RenderStatus, RenderStats), RenderError> {
    assert!(scene.is_built(), "render before build_acceleration");

    let (width, height) = (options.width, options.height);

    // Channel layout is shared by every worker; the integrator reserves
    // its channels once, before any sampling happens.
    let mut layout = SampleLayout::new();
    let jitter_ch = layout.add_channel_2d(1);
    let lens_ch = layout.add_channel_2d(1);
    let integrator = Integrator::new(kind, integ_params, &mut layout);

    // Row-by-row mode renders full-width single-row tiles on one worker.
    let (tiles, threads) = if options.by_rows {
        let rows = (0..height)
            .map(|y| Tile {
                x: 0,
                y,
                w: width,
                h: 1,
            })
            .collect();
        (rows, 1)
    } else {
        (make_tiles(width, height, options.tile_size), options.threads)
    };

    // Per-row count of tiles whose splat footprint touches the row; a
    // row is settled when its count drains to zero.
    let mut rows_pending = vec![0u32; height as usize];
    for tile in &tiles {
        let (_, fy0, _, fh) =
            FilteredAccum::tile_footprint(tile.x, tile.y, tile.w, tile.h, &filter, width, height);
        for y in fy0..fy0 + fh {
            rows_pending[y as usize] += 1;
        }
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| RenderError::Pool(e.to_string()))?;

    let mut image = FilteredAccum::new(width, height, filter);
    let mut total_stats = RenderStats::default();
    let mut cancelled = false;
    let mut flush_row: u32 = 0;
    let mut rows_written: u32 = 0;
    let mut sink_error: Option<std::io::Error> = None;

    let (tx, rx) = mpsc::channel::<TileResult>();

    pool.in_place_scope(|scope| {
        for (index, tile) in tiles.iter().copied().enumerate() {
            let tx = tx.clone();
            let layout = &layout;
            let integrator = &integrator;
            scope.spawn(move |_| {
                let splat = if stop.load(Ordering::Relaxed) {
                    None
                } else {
                    Some(render_tile(
                        scene, camera, integrator, layout, options, filter, tile, jitter_ch,
                        lens_ch,
                    ))
                };
                let (splat, stats) = match splat {
                    Some((splat, stats)) => (Some(splat), stats),
                    None => (None, RenderStats::default()),
                };
                // The receiver may be gone if the sink failed; workers
                // just finish quietly in that case.
                let _ = tx.send(TileResult {
                    index,
                    splat,
                    stats,
                });
            });
        }
        drop(tx);

        // Merge results strictly in tile-index order so accumulation is
        // deterministic, buffering any tile that finishes early.
        let mut pending: BTreeMap<usize, TileResult> = BTreeMap::new();
        let mut next = 0usize;
        for result in rx.iter() {
            pending.insert(result.index, result);

            while let Some(result) = pending.remove(&next) {
                total_stats.merge(&result.stats);
                let tile = tiles[next];
                match result.splat {
                    Some(splat) => image.merge(&splat),
                    None => cancelled = true,
                }

                let (_, fy0, _, fh) = FilteredAccum::tile_footprint(
                    tile.x, tile.y, tile.w, tile.h, &filter, width, height,
                );
                for y in fy0..fy0 + fh {
                    rows_pending[y as usize] -= 1;
                }

                // Flush every newly settled row, in order.
                while flush_row < height && rows_pending[flush_row as usize] == 0 {
                    if !cancelled && sink_error.is_none() {
                        match sink.write_row(image.resolve_row(flush_row)) {
                            Ok(()) => rows_written += 1,
                            Err(e) => {
                                sink_error = Some(e);
                                // Make the remaining tiles cheap.
                                stop.store(true, Ordering::Relaxed);
                            }
                        }
                    }
                    flush_row += 1;
                }

                next += 1;
                log::debug!("tile {next}/{} merged", tiles.len());
            }
        }
    });

    if let Some(e) = sink_error {
        return Err(RenderError::Output(e));
    }
    sink.close()?;

    let status = if cancelled {
        RenderStatus::Cancelled { rows_written }
    } else {
        RenderStatus::Complete
    };
    Ok((status, total_stats))
}

/// Render one tile into a private splat buffer sized to its footprint.
#[allow(clippy::too_many_arguments)]
fn render_tile(
    scene: &Scene,
    camera: &Camera,
    integrator: &Integrator,
    layout: &SampleLayout,
    options: &RenderOptions,
    filter: Filter,
    tile: Tile,
    jitter_ch: Channel2d,
    lens_ch: Channel2d,
) -> (FilteredAccum, RenderStats) {
    let (fx0, fy0, fw, fh) = FilteredAccum::tile_footprint(
        tile.x,
        tile.y,
        tile.w,
        tile.h,
        &filter,
        options.width,
        options.height,
    );
    let mut splat = FilteredAccum::for_region(fx0, fy0, fw, fh, filter);
    let mut ctx = RenderContext::new(scene, options, layout);

    for py in tile.y..tile.y + tile.h {
        for px in tile.x..tile.x + tile.w {
            ctx.start_pixel(px, py);
            for s in 0..options.samples_per_pixel {
                ctx.start_camera_ray(px, py, s);
                let jitter = ctx.samples.get_2d(jitter_ch, s, 0);
                let lens = ctx.samples.get_2d(lens_ch, s, 0);

                let ray = camera.generate_ray(
                    px,
                    py,
                    options.width,
                    options.height,
                    jitter,
                    lens,
                );
                let value = integrator.li(ray, &mut ctx, s);
                splat.splat(px as f32 + jitter.x, py as f32 + jitter.y, value);
            }
        }
    }

    (splat, ctx.stats)
}
