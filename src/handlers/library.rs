use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, imageops::FilterType};
use uuid::Uuid;

use super::options::{ConvertOptions, Resize};
use super::traits::{ConvertHandler, HandlerError, HandlerResult, OutputMetadata};

/// In-process engine over the `image` crate.
///
/// Covers the raster-to-raster routes without spawning a subprocess. Decoding
/// and encoding are CPU-bound, so the whole chain runs on the blocking pool.
/// Targets the crate cannot encode (pdf, svg) are rejected up front; rotation
/// is limited to 90-degree steps, a limitation of the in-process decoder.
#[derive(Debug, Clone)]
pub struct LibraryHandler {
    out_dir: PathBuf,
}

impl LibraryHandler {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self { out_dir: out_dir.into() }
    }
}

#[async_trait]
impl ConvertHandler for LibraryHandler {
    async fn convert(
        &self,
        input: &Path,
        target: &str,
        options: &ConvertOptions,
    ) -> Result<HandlerResult, HandlerError> {
        let format = ImageFormat::from_extension(target)
            .ok_or_else(|| HandlerError::UnsupportedTarget(target.to_string()))?;

        let name = format!("conv-{}.{}", Uuid::new_v4(), target);
        let scratch = self.out_dir.join(format!(".{name}"));
        let output = self.out_dir.join(&name);

        let input = input.to_path_buf();
        let options = options.clone();
        let scratch_path = scratch.clone();
        let result = tokio::task::spawn_blocking(move || {
            transform(&input, &scratch_path, format, &options)
        })
        .await
        .map_err(|e| HandlerError::Failed(format!("engine task panicked: {e}")))?;

        let mut metadata = match result {
            Ok(metadata) => metadata,
            Err(err) => {
                let _ = tokio::fs::remove_file(&scratch).await;
                return Err(err);
            }
        };

        tokio::fs::rename(&scratch, &output)
            .await
            .map_err(|e| HandlerError::Failed(format!("failed to publish output: {e}")))?;

        metadata.format = Some(target.to_string());
        Ok(HandlerResult { output_path: output, metadata: Some(metadata) })
    }
}

/// Decode, then crop, resize, rotate, mirror, and re-encode.
fn transform(
    input: &Path,
    scratch: &Path,
    format: ImageFormat,
    options: &ConvertOptions,
) -> Result<OutputMetadata, HandlerError> {
    let mut img =
        image::open(input).map_err(|e| HandlerError::Failed(format!("decode failed: {e}")))?;

    if let Some(crop) = options.crop {
        img = img.crop_imm(crop.x, crop.y, crop.width, crop.height);
    }

    if let Some(resize) = options.resize {
        let (width, height) = resize_bounds(resize);
        img = img.resize(width, height, FilterType::Lanczos3);
    }

    match options.rotate.unwrap_or(0).rem_euclid(360) {
        0 => {}
        90 => img = img.rotate90(),
        180 => img = img.rotate180(),
        270 => img = img.rotate270(),
        other => {
            return Err(HandlerError::Failed(format!(
                "in-process engine rotates in 90 degree steps, got {other}"
            )));
        }
    }

    if options.flip {
        img = img.flipv();
    }
    if options.flop {
        img = img.fliph();
    }

    encode(&img, scratch, format, options.quality)?;

    let size_bytes = std::fs::metadata(scratch).ok().map(|m| m.len());
    Ok(OutputMetadata {
        width: Some(img.width()),
        height: Some(img.height()),
        size_bytes,
        format: None,
    })
}

/// Missing dimension means "unconstrained"; `resize` keeps the aspect ratio
/// within the bounds.
fn resize_bounds(resize: Resize) -> (u32, u32) {
    (resize.width.unwrap_or(u32::MAX), resize.height.unwrap_or(u32::MAX))
}

fn encode(
    img: &DynamicImage,
    path: &Path,
    format: ImageFormat,
    quality: Option<u8>,
) -> Result<(), HandlerError> {
    match format {
        // JPEG has no alpha channel and is the one target with a real
        // quality knob.
        ImageFormat::Jpeg => {
            let file = File::create(path)
                .map_err(|e| HandlerError::Failed(format!("encode failed: {e}")))?;
            let mut writer = BufWriter::new(file);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut writer,
                quality.unwrap_or(90),
            );
            img.to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|e| HandlerError::Failed(format!("encode failed: {e}")))
        }
        _ => img
            .save_with_format(path, format)
            .map_err(|e| HandlerError::Failed(format!("encode failed: {e}"))),
    }
}
