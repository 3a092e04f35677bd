//! Metascoop core: F-Droid repository reconciliation
//!
//! Keeps per-package metadata, changelogs, assets, badges and the README
//! table consistent with the index produced by `fdroid update`.

pub mod apps;
pub mod badges;
pub mod download;
pub mod error;
pub mod fs_util;
pub mod index;
pub mod layout;
pub mod lifecycle;
pub mod metadata;
pub mod pipeline;
pub mod readme;
pub mod reconcile;
pub mod source;
pub mod tools;
pub mod version;

pub use error::{MetascoopError, Result};
pub use pipeline::Engine;
