//! `vidq restart <id>` – re-run a job from scratch.

use anyhow::{Context, Result};
use vidq_core::manager::JobManager;
use vidq_core::store::JobId;

pub async fn run_restart(manager: &JobManager, id: JobId) -> Result<()> {
    manager.restart(id)?;
    println!("Restarted job {id}.");
    manager.wait_idle().await;
    let job = manager.job(id).context("job vanished while running")?;
    println!("Job {id}: {}", job.status_text);
    Ok(())
}
