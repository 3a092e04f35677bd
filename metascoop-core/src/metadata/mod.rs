//! Per-package metadata records maintained alongside the index
//!
//! One YAML document per package under the metadata root. The engine owns a
//! fixed set of keys and carries everything else through unchanged.

mod record;
pub mod store;

pub use record::{
    set_if_informative, truncate_summary, BuildEntry, MetadataRecord, TagList,
    MAX_SUMMARY_LENGTH, UNKNOWN_SENTINEL,
};
