//! External collaborators of the archive pipeline.
//!
//! - Archiver subprocess (`PostArchiver`)
//! - Channel metadata (`ChannelSource`)
//! - Fresh display order (`OrderSource`)
//! - Viewer export (`ViewerRenderer`)

pub mod archiver;
pub mod channel;
pub mod order;
pub mod viewer;

pub use archiver::{ArchiveOutcome, ArchiverRunner, PostArchiver};
pub use channel::{ChannelFetcher, ChannelSource};
pub use order::{FileOrderSource, NoOrderSource, OrderSource, PageOrderSource};
pub use viewer::{JsonViewerExporter, ViewerRenderer};
