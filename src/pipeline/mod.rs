//! Archive processing pipeline.
//!
//! - `reconcile`: canonical post order across runs
//! - `membership`: restore member-only status lost on re-archive
//! - `query`: classification, filters and statistics
//! - `snapshot`: processed view handed to the exporter
//! - `archive`: `run_archive`, `run_generate` and `run_reorder`

pub mod archive;
pub mod membership;
pub mod query;
pub mod reconcile;
pub mod snapshot;

pub use archive::{ArchiveRequest, Collaborators, RunReport, run_archive, run_generate, run_reorder};
pub use reconcile::{OrderMode, Reconciliation, reconcile_order};
pub use snapshot::ProcessedSnapshot;
