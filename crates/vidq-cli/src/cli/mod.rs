//! CLI for the vidq media download queue.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use vidq_core::config;
use vidq_core::manager::JobManager;
use vidq_core::store::JobStore;
use vidq_core::thumbs::NoThumbnails;
use vidq_core::tool::YtDlpTool;

use commands::{
    run_add, run_clear, run_lock, run_remove, run_restart, run_run, run_status, run_unlock,
};

/// Top-level CLI for the vidq media download queue.
#[derive(Debug, Parser)]
#[command(name = "vidq")]
#[command(about = "vidq: queued media downloads driven by yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Add a download job and run it. Equivalent links for already-tracked
    /// content are dropped.
    Add {
        /// Video or playlist URLs (whitespace-tolerant; junk is ignored).
        urls: Vec<String>,

        /// Read additional URLs from a text file.
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// Process every queued job, then exit.
    Run {
        /// Also re-run unfinished (failed or interrupted) unlocked jobs.
        #[arg(long)]
        incomplete: bool,
    },

    /// Show all jobs.
    Status {
        /// Also print each job's URLs.
        #[arg(long)]
        urls: bool,
    },

    /// Re-run a finished or failed job from scratch.
    Restart {
        /// Job identifier.
        id: i64,
    },

    /// Remove a job by ID, cancelling it first if it is running.
    Remove {
        /// Job identifier.
        id: i64,
    },

    /// Protect a job from restart/removal.
    Lock {
        /// Job identifier.
        id: i64,
    },

    /// Lift a job's protection.
    Unlock {
        /// Job identifier.
        id: i64,
    },

    /// Remove all finished jobs (locked ones stay).
    Clear,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let store = JobStore::open_default()?;
        let app_root = std::env::current_dir()?;
        let manager = JobManager::new(
            cfg,
            store,
            Arc::new(YtDlpTool::default()),
            Arc::new(NoThumbnails),
            app_root,
        );

        match cli.command {
            CliCommand::Add { urls, file } => run_add(&manager, &urls, file.as_deref()).await?,
            CliCommand::Run { incomplete } => run_run(&manager, incomplete).await?,
            CliCommand::Status { urls } => run_status(&manager, urls)?,
            CliCommand::Restart { id } => run_restart(&manager, id).await?,
            CliCommand::Remove { id } => run_remove(&manager, id).await?,
            CliCommand::Lock { id } => run_lock(&manager, id)?,
            CliCommand::Unlock { id } => run_unlock(&manager, id)?,
            CliCommand::Clear => run_clear(&manager)?,
        }

        Ok(())
    }
}
