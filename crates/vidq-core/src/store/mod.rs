//! Durable record log for the job collection.
//!
//! One flat CSV file, rewritten in full (temp file + atomic rename) on every
//! mutation so a crash can never expose a partial batch. Loading is lenient:
//! a corrupt or unreadable file yields an empty collection and the system
//! proceeds as a fresh install.

mod record;

pub use record::{Job, JobId, JobState, URL_DELIMITER};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Handle to the on-disk job list.
///
/// The default location is `~/.local/state/vidq/jobs.csv`.
#[derive(Debug, Clone)]
pub struct JobStore {
    path: PathBuf,
}

/// XDG state directory (`~/.local/state/vidq`), shared by the job store,
/// the error logs, and the log file. Created on first use.
pub fn state_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vidq")?;
    let dir = xdg_dirs.get_state_home();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create state dir {}", dir.display()))?;
    Ok(dir)
}

impl JobStore {
    /// Store under the XDG state directory, creating parents as needed.
    pub fn open_default() -> Result<Self> {
        Ok(Self {
            path: state_dir()?.join("jobs.csv"),
        })
    }

    /// Store at a specific path. Intended for tests.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all records, sorted by `created_at` (ties broken by id) in the
    /// requested direction. Missing file, unreadable file, or corrupt rows
    /// never fail the load; bad rows are skipped with a warning.
    pub fn load(&self, sort_desc: bool) -> Vec<Job> {
        let mut reader = match csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
        {
            Ok(r) => r,
            Err(e) => {
                if self.path.exists() {
                    tracing::warn!("job store unreadable, starting empty: {e}");
                }
                return Vec::new();
            }
        };

        let mut jobs = Vec::new();
        for row in reader.deserialize::<Job>() {
            match row {
                Ok(job) => jobs.push(job),
                Err(e) => tracing::warn!("skipping corrupt job record: {e}"),
            }
        }
        sort_jobs(&mut jobs, sort_desc);
        jobs
    }

    /// Rewrites the entire record set atomically from the full collection.
    pub fn save(&self, jobs: &[Job]) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create store dir {}", dir.display()))?;

        // Write next to the target so the rename stays on one filesystem.
        let tmp = tempfile::NamedTempFile::new_in(dir).context("create temp store file")?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());
            for job in jobs {
                writer.serialize(job).context("serialize job record")?;
            }
            writer.flush().context("flush job records")?;
        }
        tmp.persist(&self.path)
            .with_context(|| format!("replace job store {}", self.path.display()))?;
        Ok(())
    }
}

/// Display/load order: a single global toggle over creation time.
pub fn sort_jobs(jobs: &mut [Job], desc: bool) {
    jobs.sort_by_key(|j| (j.created_at, j.id));
    if desc {
        jobs.reverse();
    }
}

/// Current time as Unix seconds (record timestamps).
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
