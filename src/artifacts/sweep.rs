/// Expiry sweep over the artifact partition.
///
/// Retrieval already refuses expired records on its own, so the sweep exists
/// to reclaim space: it drops expired index entries and best-effort deletes
/// the files they pointed at.
use chrono::Utc;
use fjall::PartitionHandle;
use tracing::{info, warn};

use super::error::Result;
use super::keys::{decode_artifact_key, encode_meta_key};
use super::store::ArtifactRecord;

const META_LAST_SWEEP: &str = "last_sweep";

#[derive(Debug, Default)]
pub struct SweepStats {
    pub records_removed: usize,
    pub files_removed: usize,
}

pub fn sweep_expired(
    artifacts: &PartitionHandle,
    metadata: &PartitionHandle,
) -> Result<SweepStats> {
    let now = Utc::now();
    let mut stats = SweepStats::default();
    let mut expired: Vec<(Vec<u8>, Option<String>)> = Vec::new();

    for item in artifacts.iter() {
        let (key, value) = item?;
        match serde_json::from_slice::<ArtifactRecord>(&value) {
            Ok(record) if record.is_expired_at(now) => {
                expired.push((key.to_vec(), Some(record.path)));
            }
            Ok(_) => {}
            Err(e) => {
                // An unreadable entry can never be served; drop it.
                warn!(
                    hash = ?decode_artifact_key(&key),
                    error = %e,
                    "Dropping undecodable artifact entry"
                );
                expired.push((key.to_vec(), None));
            }
        }
    }

    for (key, path) in expired {
        artifacts.remove(key)?;
        stats.records_removed += 1;

        if let Some(path) = path {
            // Best effort: the index entry is already gone either way.
            if std::fs::remove_file(&path).is_ok() {
                stats.files_removed += 1;
            }
        }
    }

    metadata.insert(
        encode_meta_key(META_LAST_SWEEP),
        now.timestamp().to_string().as_bytes(),
    )?;

    info!(
        records = stats.records_removed,
        files = stats.files_removed,
        "Artifact sweep complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactStore;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn sweep_removes_expired_records_and_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(temp_dir.path().join("artifacts")).unwrap();

        let live_file = temp_dir.path().join("live.pdf");
        let dead_file = temp_dir.path().join("dead.pdf");
        std::fs::write(&live_file, b"live").unwrap();
        std::fs::write(&dead_file, b"dead").unwrap();

        let live = ArtifactRecord::publish(
            live_file.to_str().unwrap(),
            Duration::hours(24),
            false,
        );
        let mut dead = ArtifactRecord::publish(
            dead_file.to_str().unwrap(),
            Duration::hours(24),
            false,
        );
        dead.expires_at = Some(Utc::now() - Duration::minutes(1));

        store.put(&live).unwrap();
        store.put(&dead).unwrap();

        let stats = store.sweep_expired().unwrap();
        assert_eq!(stats.records_removed, 1);
        assert_eq!(stats.files_removed, 1);

        assert!(live_file.exists());
        assert!(!dead_file.exists());
        assert!(store.get_by_hash(&live.hash).is_ok());
        assert!(store.get_by_hash(&dead.hash).is_err());
    }

    #[test]
    fn sweep_of_empty_store_is_a_noop() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(temp_dir.path().join("artifacts")).unwrap();

        let stats = store.sweep_expired().unwrap();
        assert_eq!(stats.records_removed, 0);
        assert_eq!(stats.files_removed, 0);
    }
}
