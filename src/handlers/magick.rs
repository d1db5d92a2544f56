use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use super::options::{ConvertOptions, Crop, Resize};
use super::traits::{ConvertHandler, HandlerError, HandlerResult, OutputMetadata};

/// Out-of-process engine driving the ImageMagick CLI.
///
/// ImageMagick infers the output format from the file extension, so the
/// output name carries the target format and the in-flight temp name keeps
/// the same extension behind a leading dot.
#[derive(Debug, Clone)]
pub struct MagickHandler {
    binary: String,
    out_dir: PathBuf,
}

impl MagickHandler {
    pub fn new(binary: impl Into<String>, out_dir: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into(), out_dir: out_dir.into() }
    }

    /// Argument vector for one invocation: input, one flag per requested
    /// transform, output last.
    fn build_args(input: &Path, output: &Path, options: &ConvertOptions) -> Vec<String> {
        let mut args = vec![input.display().to_string()];

        if let Some(Resize { width, height }) = options.resize {
            let spec = match (width, height) {
                (Some(w), Some(h)) => format!("{w}x{h}"),
                (Some(w), None) => w.to_string(),
                (None, Some(h)) => format!("x{h}"),
                (None, None) => String::new(),
            };
            if !spec.is_empty() {
                args.push("-resize".into());
                args.push(spec);
            }
        }

        if let Some(Crop { x, y, width, height }) = options.crop {
            args.push("-crop".into());
            args.push(format!("{width}x{height}+{x}+{y}"));
        }

        if let Some(degrees) = options.rotate {
            args.push("-rotate".into());
            args.push(degrees.to_string());
        }

        if options.flip {
            args.push("-flip".into());
        }
        if options.flop {
            args.push("-flop".into());
        }

        if let Some(quality) = options.quality {
            args.push("-quality".into());
            args.push(quality.to_string());
        }

        args.push(output.display().to_string());
        args
    }
}

#[async_trait]
impl ConvertHandler for MagickHandler {
    async fn convert(
        &self,
        input: &Path,
        target: &str,
        options: &ConvertOptions,
    ) -> Result<HandlerResult, HandlerError> {
        let name = format!("conv-{}.{}", Uuid::new_v4(), target);
        let scratch = self.out_dir.join(format!(".{name}"));
        let output = self.out_dir.join(&name);

        let args = Self::build_args(input, &scratch, options);
        debug!(binary = %self.binary, ?args, "Invoking ImageMagick");

        // If the request is cancelled mid-flight the subprocess goes with it.
        let result = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                HandlerError::Failed(format!("failed to launch {}: {}", self.binary, e))
            })?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        if !result.status.success() || !stderr.trim().is_empty() {
            let _ = tokio::fs::remove_file(&scratch).await;
            let diagnostic = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&result.stdout).trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(HandlerError::Failed(format!(
                "{} exited with {}: {}",
                self.binary, result.status, diagnostic
            )));
        }

        tokio::fs::rename(&scratch, &output)
            .await
            .map_err(|e| HandlerError::Failed(format!("failed to publish output: {e}")))?;

        let size_bytes = tokio::fs::metadata(&output).await.ok().map(|m| m.len());
        Ok(HandlerResult {
            output_path: output,
            metadata: Some(OutputMetadata {
                size_bytes,
                format: Some(target.to_string()),
                ..Default::default()
            }),
        })
    }
}
