//! The `glint` command-line renderer.

mod camcmd;
mod sink;
mod testscene;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use glint_core::{Color, Envmap, RenderParams};
use glint_renderer::{
    render, Filter, IntegratorKind, RenderError, RenderOptions, RenderStatus, Scene,
};
use thiserror::Error;

use sink::SinkError;
use testscene::SceneError;

#[derive(Parser, Debug)]
#[command(name = "glint", version, about = "Physically-based offline renderer")]
struct Args {
    /// Scene to render; `test:NAME` selects a built-in test scene
    scene: String,

    /// Output image size, WIDTHxHEIGHT
    #[arg(long, default_value = "512x384")]
    size: String,

    /// Output image path (format chosen by extension: png, jpg, ppm)
    #[arg(short, long, default_value = "glint-out.png")]
    output: PathBuf,

    /// Samples per pixel
    #[arg(short, long, default_value_t = 16)]
    samples: u32,

    /// Reconstruction filter: NAME[.K=V,...] (box, triangle, gauss,
    /// mitchell, none)
    #[arg(long)]
    filter: Option<String>,

    /// Surface integrator: {direct|path}[,K=V,...]
    #[arg(long, default_value = "path")]
    integrator: String,

    /// Worker threads (0 = one per core)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Extra rendering options, K=V[,...]
    #[arg(short = 'R', long)]
    render_options: Option<String>,

    /// Background: a gray level, `R,G,B`, or an environment-map image
    #[arg(long)]
    background: Option<String>,

    /// Camera commands (`g POS`, `t POS`, `z N`, `m DIR DIST`,
    /// `r AXIS DEG`, `o AXIS DEG`, comma-separated)
    #[arg(long)]
    camera: Option<String>,

    /// Write the resolved render parameters to a text sidecar
    #[arg(long)]
    params_out: Option<PathBuf>,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Usage(_) => 1,
            CliError::Sink(_) | CliError::Io { .. } | CliError::Render(_) => 2,
            CliError::Scene(_) => 3,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env().init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("glint: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(s) = source {
                eprintln!("  caused by: {s}");
                source = s.source();
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let (width, height) = parse_size(&args.size)?;

    let mut params = RenderParams::new();
    if let Some(opts) = &args.render_options {
        params.parse(opts).map_err(CliError::Usage)?;
    }

    let filter = Filter::from_spec(args.filter.as_deref().unwrap_or("mitchell"))
        .map_err(CliError::Usage)?
        // "none" point-samples: a box just wide enough for one pixel.
        .unwrap_or(Filter::Box { radius: 0.5 });

    let (integ_name, integ_opts) = match args.integrator.split_once(',') {
        Some((name, opts)) => (name, opts),
        None => (args.integrator.as_str(), ""),
    };
    let kind: IntegratorKind = integ_name.parse().map_err(CliError::Usage)?;
    let mut integ_params = RenderParams::new();
    integ_params.parse(integ_opts).map_err(CliError::Usage)?;

    // Scene loading. File-format loaders are external collaborators;
    // the built-in scenes cover the test: namespace.
    let (mut scene, mut camera) = match args.scene.strip_prefix("test:") {
        Some(name) => testscene::build(name)?,
        None => return Err(SceneError::UnsupportedFormat(args.scene.clone()).into()),
    };

    if let Some(spec) = &args.background {
        apply_background(&mut scene, spec)?;
    }

    camera.set_aspect(width as f32 / height as f32);
    if let Some(cmds) = &args.camera {
        camcmd::apply(&mut camera, cmds)
            .map_err(|e| CliError::Usage(format!("{cmds}: error in camera commands: {e}")))?;
    }

    scene.build_acceleration();

    let mut options = RenderOptions::new(width, height, args.samples).apply_params(&params);
    options.threads = args.threads;

    let mut sink = sink::open(&args.output, width, height, &params)?;

    log::info!(
        "rendering {}x{} at {} spp to {}",
        width,
        height,
        args.samples,
        args.output.display()
    );
    let stop = AtomicBool::new(false);
    let (status, stats) = render(
        &scene,
        &camera,
        kind,
        &integ_params,
        &options,
        filter,
        sink.as_mut(),
        &stop,
    )?;

    if let Some(path) = &args.params_out {
        write_params_sidecar(path, &args, &options, &params, &integ_params).map_err(|source| {
            CliError::Io {
                path: path.clone(),
                source,
            }
        })?;
    }

    match status {
        RenderStatus::Complete => log::info!(
            "done: {} camera rays, {} closest-hit and {} shadow queries",
            stats.camera_rays,
            stats.closest_queries,
            stats.shadow_queries
        ),
        RenderStatus::Cancelled { rows_written } => {
            log::warn!("render cancelled; {rows_written} rows written")
        }
    }
    Ok(())
}

fn parse_size(spec: &str) -> Result<(u32, u32), CliError> {
    let bad = || CliError::Usage(format!("{spec}: image size must be WIDTHxHEIGHT"));
    let (w, h) = spec
        .split_once(['x', 'X'])
        .ok_or_else(bad)?;
    let width: u32 = w.parse().map_err(|_| bad())?;
    let height: u32 = h.parse().map_err(|_| bad())?;
    if width == 0 || height == 0 {
        return Err(bad());
    }
    Ok((width, height))
}

/// `--background` accepts a gray level, an `R,G,B` triple, or an image
/// path to use as an environment map.
fn apply_background(scene: &mut Scene, spec: &str) -> Result<(), CliError> {
    if let Ok(gray) = spec.parse::<f32>() {
        scene.set_background_color(Color::gray(gray));
        return Ok(());
    }

    let floats: Option<Vec<f32>> = spec.split(',').map(|p| p.trim().parse().ok()).collect();
    if let Some(values) = floats {
        if values.len() == 3 {
            scene.set_background_color(Color::new(values[0], values[1], values[2]));
            return Ok(());
        }
        return Err(CliError::Usage(format!(
            "{spec}: background color must be GRAY or R,G,B"
        )));
    }

    let map = Envmap::load(std::path::Path::new(spec)).map_err(|source| SceneError::Envmap {
        path: spec.to_string(),
        source,
    })?;
    scene.set_background_map(Arc::new(map));
    Ok(())
}

fn write_params_sidecar(
    path: &std::path::Path,
    args: &Args,
    options: &RenderOptions,
    params: &RenderParams,
    integ_params: &RenderParams,
) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "scene: {}", args.scene)?;
    writeln!(file, "size: {}x{}", options.width, options.height)?;
    writeln!(file, "samples: {}", options.samples_per_pixel)?;
    writeln!(file, "integrator: {}", args.integrator)?;
    writeln!(
        file,
        "filter: {}",
        args.filter.as_deref().unwrap_or("mitchell")
    )?;
    writeln!(file, "threads: {}", options.threads)?;
    writeln!(file, "min-trace: {}", options.min_trace)?;
    writeln!(file, "tile-size: {}", options.tile_size)?;
    if !params.is_empty() {
        writeln!(file, "render-options: {params}")?;
    }
    if !integ_params.is_empty() {
        writeln!(file, "integrator-options: {integ_params}")?;
    }
    Ok(())
}
