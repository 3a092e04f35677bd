//! metascoop - keeps an F-Droid repository in sync with GitHub
//!
//! Stages release and pull request builds, rebuilds the index and brings
//! metadata, badges and the README table back in line with it.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use metascoop_core::apps::AppFile;
use metascoop_core::layout::RepoLayout;
use metascoop_core::pipeline::{self, Published};
use metascoop_core::source::github::GitHubClient;
use metascoop_core::source::git::GitCli;
use metascoop_core::tools::FdroidUpdate;
use metascoop_core::Engine;

mod pr_cli;

/// Log levels
#[derive(Debug, Clone, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "metascoop",
    about = "Keep an F-Droid repository in sync with GitHub releases and pull requests",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// App list
    #[clap(short = 'a', long, default_value = "apps.yaml", global = true)]
    app_file: PathBuf,

    /// Artifact directory of the F-Droid repository
    #[clap(short = 'r', long, default_value = "fdroid/repo", global = true)]
    repo_dir: PathBuf,

    /// GitHub access token
    #[clap(short = 't', long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,

    /// Skip the index rebuild that precedes reconciliation
    #[clap(short = 'd', long, global = true)]
    debug: bool,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,
}

#[derive(Parser, Debug)]
enum Command {
    /// Stage a release build, or every pre-release of every app when no
    /// app and version are given
    Release {
        /// App key from the app list
        app: Option<String>,

        /// Release tag
        version: Option<String>,
    },

    /// Add or remove pull request builds
    Pr {
        #[clap(subcommand)]
        command: pr_cli::PrCommand,
    },

    /// Regenerate badges.yaml from the current index
    Badges,

    /// Regenerate the apps table in README.md from the current index
    Readme,
}

/// Initialize tracing from --log-level, letting RUST_LOG override it
fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Real collaborators shared by the commands that run the pipeline
pub(crate) struct Workspace {
    pub layout: RepoLayout,
    pub apps: AppFile,
    pub host: GitHubClient,
    pub checkout: GitCli,
    pub builder: FdroidUpdate,
    pub debug: bool,
}

impl Workspace {
    fn load(cli: &Cli) -> Result<Self> {
        let apps = load_apps(cli)?;
        let token = cli.access_token.clone().filter(|t| !t.is_empty());
        if token.is_none() {
            warn!("No access token given, GitHub requests are anonymous and rate limited");
        }

        Ok(Self {
            layout: RepoLayout::new(&cli.repo_dir),
            apps,
            host: GitHubClient::new(token).context("Failed to create GitHub client")?,
            checkout: GitCli::new(),
            builder: FdroidUpdate::new(),
            debug: cli.debug,
        })
    }

    pub fn engine(&self) -> Engine<'_> {
        Engine::new(
            &self.layout,
            &self.apps,
            &self.host,
            &self.checkout,
            &self.builder,
        )
        .skip_first_rebuild(self.debug)
    }
}

fn load_apps(cli: &Cli) -> Result<AppFile> {
    let apps = AppFile::load(&cli.app_file)
        .with_context(|| format!("Failed to load app list {}", cli.app_file.display()))?;
    info!("Loaded {} apps from {}", apps.apps.len(), cli.app_file.display());
    Ok(apps)
}

/// Summarize a finished pipeline run
pub(crate) fn report(published: &Published) {
    let report = &published.report;
    for (package, reason) in &report.failed {
        warn!(package = %package, "Not updated: {}", reason);
    }
    info!(
        "Updated {} packages ({} skipped, {} failed), {} badges",
        report.updated.len(),
        report.skipped.len(),
        report.failed.len(),
        published.badges.len()
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);

    let result = run(cli).await;
    if let Err(e) = &result {
        error!("Fatal: {:#}", e);
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Release { app, version } => {
            let ctx = Workspace::load(&cli)?;
            release_command(&ctx, app.as_deref(), version.as_deref()).await
        }
        Command::Pr { command } => {
            let ctx = Workspace::load(&cli)?;
            command.execute(&ctx).await
        }
        Command::Badges => badges_command(&RepoLayout::new(&cli.repo_dir), &load_apps(&cli)?),
        Command::Readme => readme_command(&RepoLayout::new(&cli.repo_dir)),
    }
}

async fn release_command(ctx: &Workspace, app: Option<&str>, version: Option<&str>) -> Result<()> {
    let engine = ctx.engine();
    let staged = match (app, version) {
        (Some(app), Some(version)) => {
            info!("Adding release {} of {}", version, app);
            engine
                .add_release(app, version)
                .await
                .with_context(|| format!("Failed to add release {version} of {app}"))?
        }
        _ => {
            info!("Adding the pre-releases of every app");
            engine
                .add_all_releases()
                .await
                .context("Failed to stage releases")?
        }
    };

    let published = engine.run(staged).await.context("Failed to update the repository")?;
    report(&published);
    Ok(())
}

fn badges_command(layout: &RepoLayout, apps: &AppFile) -> Result<()> {
    let badges = pipeline::refresh_badges(layout, apps)
        .context("Failed to regenerate badges")?;
    for (app, label) in &badges {
        info!("{}: {}", app, label);
    }
    Ok(())
}

fn readme_command(layout: &RepoLayout) -> Result<()> {
    pipeline::refresh_readme(layout).context("Failed to regenerate the README table")
}
