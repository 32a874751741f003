//! Row sinks: thin encoders mapping finished rows to image files.
//!
//! Formats are chosen by file extension. Byte formats apply gamma
//! encoding (default 2.2); PPM streams rows as they settle, PNG and
//! JPEG buffer the image and encode on close.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use glint_core::RenderParams;
use glint_renderer::{Row, RowSink};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("{path}: unrecognized output format")]
    UnknownFormat { path: PathBuf },

    #[error("{path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parameters recognized by the encoders.
#[derive(Debug, Clone, Copy)]
pub struct SinkParams {
    pub gamma: f32,
    pub quality: u8,
    pub alpha: bool,
}

impl SinkParams {
    fn resolve(params: &RenderParams) -> Self {
        Self {
            // Byte formats; float formats would default to 1.0.
            gamma: params.get_float("gamma", 2.2),
            quality: params.get_uint("quality", 90).min(100) as u8,
            alpha: params.get_bool("alpha", false),
        }
    }
}

/// Open a sink for `path`, choosing the encoder by extension.
pub fn open(
    path: &Path,
    width: u32,
    height: u32,
    params: &RenderParams,
) -> Result<Box<dyn RowSink>, SinkError> {
    let params = SinkParams::resolve(params);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok(Box::new(PngSink::new(path, width, height, params))),
        "jpg" | "jpeg" => Ok(Box::new(JpegSink::new(path, width, height, params))),
        "ppm" => {
            let sink =
                PpmSink::new(path, width, height, params).map_err(|source| SinkError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(Box::new(sink))
        }
        _ => Err(SinkError::UnknownFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Gamma-encode a linear channel to a byte.
fn to_byte(v: f32, gamma: f32) -> u8 {
    let v = v.clamp(0.0, 1.0).powf(1.0 / gamma);
    (v * 255.0).round() as u8
}

struct PngSink {
    path: PathBuf,
    image: RgbaImage,
    params: SinkParams,
}

impl PngSink {
    fn new(path: &Path, width: u32, height: u32, params: SinkParams) -> Self {
        Self {
            path: path.to_path_buf(),
            image: RgbaImage::new(width, height),
            params,
        }
    }
}

impl RowSink for PngSink {
    fn write_row(&mut self, row: Row) -> io::Result<()> {
        for (i, px) in row.pixels.iter().enumerate() {
            let alpha = if self.params.alpha {
                (px.alpha.clamp(0.0, 1.0) * 255.0).round() as u8
            } else {
                255
            };
            self.image.put_pixel(
                row.x0 + i as u32,
                row.y,
                Rgba([
                    to_byte(px.color.r, self.params.gamma),
                    to_byte(px.color.g, self.params.gamma),
                    to_byte(px.color.b, self.params.gamma),
                    alpha,
                ]),
            );
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.image.save(&self.path).map_err(io::Error::other)
    }
}

struct JpegSink {
    path: PathBuf,
    image: RgbImage,
    params: SinkParams,
}

impl JpegSink {
    fn new(path: &Path, width: u32, height: u32, params: SinkParams) -> Self {
        Self {
            path: path.to_path_buf(),
            image: RgbImage::new(width, height),
            params,
        }
    }
}

impl RowSink for JpegSink {
    fn write_row(&mut self, row: Row) -> io::Result<()> {
        for (i, px) in row.pixels.iter().enumerate() {
            self.image.put_pixel(
                row.x0 + i as u32,
                row.y,
                Rgb([
                    to_byte(px.color.r, self.params.gamma),
                    to_byte(px.color.g, self.params.gamma),
                    to_byte(px.color.b, self.params.gamma),
                ]),
            );
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, self.params.quality);
        self.image
            .write_with_encoder(encoder)
            .map_err(io::Error::other)?;
        writer.flush()
    }
}

/// Binary PPM, written row by row as they settle.
struct PpmSink {
    writer: BufWriter<File>,
    params: SinkParams,
}

impl PpmSink {
    fn new(path: &Path, width: u32, height: u32, params: SinkParams) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write!(writer, "P6\n{width} {height}\n255\n")?;
        Ok(Self { writer, params })
    }
}

impl RowSink for PpmSink {
    fn write_row(&mut self, row: Row) -> io::Result<()> {
        for px in &row.pixels {
            self.writer.write_all(&[
                to_byte(px.color.r, self.params.gamma),
                to_byte(px.color.g, self.params.gamma),
                to_byte(px.color.b, self.params.gamma),
            ])?;
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_core::{Color, Tint};

    fn row(y: u32, width: u32, value: f32) -> Row {
        Row {
            x0: 0,
            y,
            pixels: (0..width)
                .map(|_| Tint::opaque(Color::gray(value)))
                .collect(),
        }
    }

    #[test]
    fn test_to_byte_gamma() {
        assert_eq!(to_byte(0.0, 2.2), 0);
        assert_eq!(to_byte(1.0, 2.2), 255);
        // Mid-gray brightens under gamma encoding.
        assert!(to_byte(0.2, 2.2) > (0.2 * 255.0) as u8);
        // Gamma 1.0 is linear.
        assert_eq!(to_byte(0.5, 1.0), 128);
        // Out of range clamps.
        assert_eq!(to_byte(7.0, 2.2), 255);
    }

    #[test]
    fn test_unknown_format() {
        let err = open(Path::new("out.tiff"), 4, 4, &RenderParams::new());
        assert!(matches!(err, Err(SinkError::UnknownFormat { .. })));
    }

    #[test]
    fn test_ppm_round_trip() {
        let dir = std::env::temp_dir();
        let path = dir.join("glint_sink_test.ppm");
        let mut params = RenderParams::new();
        params.set("gamma", "1.0");

        let mut sink = open(&path, 4, 2, &params).unwrap();
        sink.write_row(row(0, 4, 0.5)).unwrap();
        sink.write_row(row(1, 4, 1.0)).unwrap();
        sink.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let header = b"P6\n4 2\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(bytes.len(), header.len() + 4 * 2 * 3);
        assert_eq!(bytes[header.len()], 128);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_png_writes_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("glint_sink_test.png");

        let mut sink = open(&path, 2, 2, &RenderParams::new()).unwrap();
        sink.write_row(row(0, 2, 0.25)).unwrap();
        sink.write_row(row(1, 2, 0.75)).unwrap();
        sink.close().unwrap();

        let img = image::open(&path).unwrap().into_rgba8();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
        let _ = std::fs::remove_file(&path);
    }
}
