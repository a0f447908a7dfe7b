//! Per-run export state
//!
//! Everything one export accumulates before serialization. Nothing here
//! outlives the run.

use crate::external::ExternalResources;
use crate::pool::ResourcePool;
use crate::writer::PendingFiles;

/// Resources, linked files and side files of one export
#[derive(Debug, Default)]
pub struct ExportState {
    pub pool: ResourcePool,
    pub externals: ExternalResources,
    /// Written only after the walk succeeded
    pub files: PendingFiles,
}

impl ExportState {
    pub fn new() -> Self {
        Self::default()
    }
}
