use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

/// Request-scoped temporary copy of the caller's input bytes.
///
/// Exactly one request owns the file for its lifetime; the handle removes it
/// on drop, which covers every exit path out of a dispatch, success or
/// failure.
#[derive(Debug)]
pub struct StagedInput {
    path: PathBuf,
}

impl StagedInput {
    /// Write bytes under a collision-free name (millisecond timestamp plus
    /// random suffix), preserving the original extension when one is known.
    pub async fn write(
        work_dir: &Path,
        bytes: &[u8],
        filename: Option<&str>,
        fallback_ext: &str,
    ) -> std::io::Result<Self> {
        fs::create_dir_all(work_dir).await?;

        let ext = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|e| e.to_str())
            .unwrap_or(fallback_ext)
            .to_ascii_lowercase();
        let name = format!(
            "stage-{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            ext
        );

        let path = work_dir.join(name);
        fs::write(&path, bytes).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedInput {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preserves_original_extension() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedInput::write(dir.path(), b"bytes", Some("photo.JPG"), "png")
            .await
            .unwrap();
        assert_eq!(staged.path().extension().unwrap(), "jpg");
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn falls_back_to_source_format() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedInput::write(dir.path(), b"bytes", None, "jpg")
            .await
            .unwrap();
        assert_eq!(staged.path().extension().unwrap(), "jpg");
    }

    #[tokio::test]
    async fn concurrent_writes_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let a = StagedInput::write(dir.path(), b"a", Some("in.jpg"), "jpg")
            .await
            .unwrap();
        let b = StagedInput::write(dir.path(), b"b", Some("in.jpg"), "jpg")
            .await
            .unwrap();

        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"a");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"b");
    }

    #[tokio::test]
    async fn drop_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedInput::write(dir.path(), b"bytes", None, "jpg")
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }
}
