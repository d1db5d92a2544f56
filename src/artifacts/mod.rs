//! Hash-addressed artifact ledger
//!
//! Fjall-backed persistence for published conversion outputs. Every
//! successful conversion inserts one [`ArtifactRecord`] keyed by the SHA-256
//! of its canonical output path; the retrieval path resolves that hash back
//! to a file, refusing records whose expiry has passed regardless of whether
//! a sweep has run yet.
//!
//! ## Partitions
//!
//! - `artifacts`: `artifact:{hash}` -> [`ArtifactRecord`] (JSON)
//! - `metadata`: `meta:{key}` -> sweep bookkeeping (string)
//!
//! Records are append-mostly: written once on publication, read until they
//! expire, removed by [`ArtifactStore::sweep_expired`].

pub mod error;
mod hash;
mod keys;
mod store;
mod sweep;

pub use error::{ArtifactError, Result};
pub use hash::artifact_hash;
pub use store::{ArtifactRecord, ArtifactStore};
pub use sweep::SweepStats;
