//! Lifecycle operations
//!
//! Adding a build (from a release or a pull request artifact) and deleting
//! the builds of a pull request. Add operations stage artifacts and return
//! a [`Staged`](crate::pipeline::Staged) carrying the apps they touched;
//! the caller drives it through the pipeline. Deletion runs the pipeline
//! itself because it must patch records between the two index rebuilds.

mod add;
mod delete;

pub use delete::{apply_removals, DeleteOutcome, PrRemoval, RemovedPackage};

use crate::MetascoopError;

/// Attribute a hosting failure to one app so the caller can skip it
fn for_app(key: &str, error: MetascoopError) -> MetascoopError {
    match error {
        MetascoopError::SourceLookup { .. } => error,
        other => MetascoopError::source_lookup(key, other),
    }
}
