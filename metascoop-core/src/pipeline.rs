//! The fixed post-staging pipeline
//!
//! Every lifecycle operation ends the same way: rebuild the index,
//! reconcile metadata against it, rebuild again so the tool picks up the
//! reconciled records and assets, then publish badges and the README from
//! that final index. Each step consumes the previous state, so derived
//! documents can only be produced from an index read after the last
//! rebuild:
//!
//! ```text
//! Staged --index()--> Indexed --reconcile()--> Reconciled --publish()--> Published
//! ```

use tracing::{debug, info, warn};

use crate::apps::{AppFile, TouchedApps};
use crate::badges::{self, BadgeMap};
use crate::fs_util::remove_path;
use crate::index::{v2, RepoIndex};
use crate::layout::RepoLayout;
use crate::readme;
use crate::reconcile::{self, ReconcileReport};
use crate::source::{SourceCheckout, SourceHost};
use crate::tools::IndexBuilder;
use crate::Result;

/// Everything one invocation works against
pub struct Engine<'a> {
    pub layout: &'a RepoLayout,
    pub apps: &'a AppFile,
    pub host: &'a dyn SourceHost,
    pub checkout: &'a dyn SourceCheckout,
    pub builder: &'a dyn IndexBuilder,
    /// Skip the first index rebuild of a run (the artifact directory is
    /// known to be indexed already)
    pub skip_first_rebuild: bool,
}

impl<'a> Engine<'a> {
    pub fn new(
        layout: &'a RepoLayout,
        apps: &'a AppFile,
        host: &'a dyn SourceHost,
        checkout: &'a dyn SourceCheckout,
        builder: &'a dyn IndexBuilder,
    ) -> Self {
        Self {
            layout,
            apps,
            host,
            checkout,
            builder,
            skip_first_rebuild: false,
        }
    }

    pub fn skip_first_rebuild(mut self, skip: bool) -> Self {
        self.skip_first_rebuild = skip;
        self
    }

    /// Read the index as it is on disk now
    pub fn read_index(&self) -> Result<RepoIndex> {
        RepoIndex::read(&self.layout.index_v1())
    }

    /// Drive a staged operation through to publication
    pub async fn run(&self, staged: Staged) -> Result<Published> {
        staged.index(self).await?.reconcile(self).await?.publish(self)
    }
}

/// Artifacts are in place; the index does not reflect them yet
#[derive(Debug, Default)]
pub struct Staged {
    touched: TouchedApps,
}

/// The index has been rebuilt and re-read
#[derive(Debug)]
pub struct Indexed {
    touched: TouchedApps,
    index: RepoIndex,
}

/// Metadata is reconciled and the index rebuilt over it
#[derive(Debug)]
pub struct Reconciled {
    index: RepoIndex,
    report: ReconcileReport,
}

/// Final state of a run
#[derive(Debug)]
pub struct Published {
    pub index: RepoIndex,
    pub report: ReconcileReport,
    pub badges: BadgeMap,
    /// Versions that received release notes in the v2 index, if it exists
    pub whats_new: Option<usize>,
}

impl Staged {
    pub fn new(touched: TouchedApps) -> Self {
        Self { touched }
    }

    pub fn touched(&self) -> &TouchedApps {
        &self.touched
    }

    pub async fn index(self, engine: &Engine<'_>) -> Result<Indexed> {
        if engine.skip_first_rebuild {
            info!("Debug mode, not running the index tool");
            self.read(engine)
        } else {
            self.rebuild(engine).await
        }
    }

    /// Rebuild regardless of debug mode. Used after files were removed, when
    /// the index on disk is known to be stale.
    pub async fn rebuild(self, engine: &Engine<'_>) -> Result<Indexed> {
        engine.builder.rebuild(engine.layout).await?;
        self.read(engine)
    }

    fn read(self, engine: &Engine<'_>) -> Result<Indexed> {
        let index = engine.read_index()?;
        debug!(
            "Index has {} packages, {} variants",
            index.package_count(),
            index.variant_count()
        );
        Ok(Indexed {
            touched: self.touched,
            index,
        })
    }
}

impl Indexed {
    pub fn index(&self) -> &RepoIndex {
        &self.index
    }

    pub async fn reconcile(self, engine: &Engine<'_>) -> Result<Reconciled> {
        let report =
            reconcile::reconcile(engine.layout, &self.index, &self.touched, engine.checkout).await;

        engine.builder.rebuild(engine.layout).await?;

        // The tool has copied icons and screenshots into the repo by now
        for path in &report.moved_assets {
            match remove_path(path) {
                Ok(_) => debug!("Removed {}", path.display()),
                Err(e) => warn!("Removing {}: {}", path.display(), e),
            }
        }

        let index = engine.read_index()?;
        Ok(Reconciled { index, report })
    }
}

impl Reconciled {
    pub fn report(&self) -> &ReconcileReport {
        &self.report
    }

    pub fn publish(self, engine: &Engine<'_>) -> Result<Published> {
        let whats_new = match v2::sync_whats_new(engine.layout, &self.index) {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Syncing release notes into the v2 index: {}", e);
                None
            }
        };

        let badges = badges::generate(&engine.apps.apps, &self.index);
        badges::write(engine.layout, &badges)?;
        readme::regenerate(engine.layout, &self.index)?;

        Ok(Published {
            index: self.index,
            report: self.report,
            badges,
            whats_new,
        })
    }
}

/// Regenerate `badges.yaml` from the index on disk
pub fn refresh_badges(layout: &RepoLayout, apps: &AppFile) -> Result<BadgeMap> {
    let index = RepoIndex::read(&layout.index_v1())?;
    let badges = badges::generate(&apps.apps, &index);
    badges::write(layout, &badges)?;
    Ok(badges)
}

/// Regenerate the README table from the index on disk
pub fn refresh_readme(layout: &RepoLayout) -> Result<()> {
    let index = RepoIndex::read(&layout.index_v1())?;
    readme::regenerate(layout, &index)
}
