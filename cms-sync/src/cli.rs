/// # cms-sync CLI Interface (Module)
///
/// Command parsing and the async entrypoint for the `cms-sync` binary.
///
/// All pipeline logic (data models, retrieval, parsing, persistence policy) lives in
/// the [`cms-sync-core`] crate. This module wires configuration, the file store and
/// cancellation together and prints the results.
///
/// ## Commands
/// - `sync`: run both content streams and print the sync report.
/// - `show blog|albums`: print a stored collection as pretty JSON.
///
/// [`cms-sync-core`]: ../../cms-sync-core/
use crate::load_config::{load_config, CliConfig};
use crate::store::FileKvStore;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use cms_sync_core::store::{load_albums, load_blog_posts};
use cms_sync_core::synchronise::{run_sync, SynchroniseReport};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// CLI for cms-sync: pull blog posts and photo albums into a key-value store.
#[derive(Parser)]
#[clap(
    name = "cms-sync",
    version,
    about = "Sync Drive documents and Photos albums into a key-value content store"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full sync using the given config file
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Print a stored collection as JSON
    Show {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Which collection to print
        #[clap(value_enum)]
        what: Collection,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Collection {
    Blog,
    Albums,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "sync", "Starting synchronisation process");
            let report = sync(&config).await;
            println!("{report}");
            Ok(())
        }
        Commands::Show { config, what } => {
            let config = load_config(config)?;
            let store = FileKvStore::new(&config.store_dir);
            let json = match what {
                Collection::Blog => serde_json::to_string_pretty(
                    &load_blog_posts(&store, &config.sync.keys.blog).await,
                )?,
                Collection::Albums => serde_json::to_string_pretty(
                    &load_albums(&store, &config.sync.keys.albums).await,
                )?,
            };
            println!("{json}");
            Ok(())
        }
    }
}

async fn sync(config: &CliConfig) -> SynchroniseReport {
    let store = FileKvStore::new(&config.store_dir);
    let cancel = CancellationToken::new();
    let watcher = spawn_cancel_watcher(cancel.clone(), config.deadline);

    let report = run_sync(
        &config.sync,
        &config.http,
        &config.credentials,
        &store,
        &cancel,
    )
    .await;

    watcher.abort();
    tracing::info!(command = "sync", run_id = %report.run_id, "Synchronisation complete");
    report
}

/// Cancel `token` on Ctrl-C or once `deadline` elapses.
fn spawn_cancel_watcher(
    token: CancellationToken,
    deadline: Option<std::time::Duration>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let deadline_elapsed = async {
            match deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupt received, cancelling sync");
            }
            _ = deadline_elapsed => {
                tracing::warn!(?deadline, "Sync deadline elapsed, cancelling sync");
            }
        }
        token.cancel();
    })
}
