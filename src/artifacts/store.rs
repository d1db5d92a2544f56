use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{ArtifactError, Result};
use super::hash::artifact_hash;
use super::keys::encode_artifact_key;
use super::sweep::{SweepStats, sweep_expired};

/// One published artifact: a produced file plus its hash-addressed,
/// expiring index entry. Written once, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub hash: String,
    pub path: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_public: bool,
}

impl ArtifactRecord {
    /// Record for a freshly produced output path.
    pub fn publish(canonical_path: &str, ttl: Duration, is_public: bool) -> Self {
        let now = Utc::now();
        Self {
            hash: artifact_hash(canonical_path),
            path: canonical_path.to_string(),
            created_at: now,
            expires_at: Some(now + ttl),
            is_public,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Fjall-backed persistent index of published artifacts.
#[derive(Clone)]
pub struct ArtifactStore {
    keyspace: Keyspace,
    artifacts: PartitionHandle,
    metadata: PartitionHandle,
}

impl ArtifactStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening artifact store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let artifacts =
            keyspace.open_partition("artifacts", PartitionCreateOptions::default())?;
        let metadata =
            keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        Ok(Self { keyspace, artifacts, metadata })
    }

    /// Insert a record under its hash. Re-publication of the same canonical
    /// path overwrites the previous entry, which is the idempotent case.
    pub fn put(&self, record: &ArtifactRecord) -> Result<()> {
        let key = encode_artifact_key(&record.hash);
        let value = serde_json::to_vec(record)?;
        self.artifacts.insert(key, value)?;
        debug!(hash = %record.hash, path = %record.path, "Published artifact");
        Ok(())
    }

    /// Resolve a retrieval handle. An expired record reads as expired even
    /// if the file still exists and no sweep has run.
    pub fn get_by_hash(&self, hash: &str) -> Result<ArtifactRecord> {
        let key = encode_artifact_key(hash);
        let Some(value) = self.artifacts.get(key)? else {
            return Err(ArtifactError::NotFound(hash.to_string()));
        };

        let record: ArtifactRecord = serde_json::from_slice(&value)?;
        if record.is_expired_at(Utc::now()) {
            return Err(ArtifactError::Expired(hash.to_string()));
        }
        Ok(record)
    }

    /// Remove expired records and best-effort delete their files.
    pub fn sweep_expired(&self) -> Result<SweepStats> {
        let stats = sweep_expired(&self.artifacts, &self.metadata)?;
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(stats)
    }

    /// Flush pending writes to disk.
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Number of live index entries (debugging/monitoring).
    pub fn count(&self) -> Result<usize> {
        let mut count = 0;
        for item in self.artifacts.iter() {
            item?;
            count += 1;
        }
        Ok(count)
    }
}
