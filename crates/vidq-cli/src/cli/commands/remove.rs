//! `vidq remove <id>` – remove a job, cancelling it first if needed.

use anyhow::Result;
use vidq_core::manager::JobManager;
use vidq_core::store::JobId;

pub async fn run_remove(manager: &JobManager, id: JobId) -> Result<()> {
    manager.delete(id).await?;
    println!("Removed job {id}.");
    Ok(())
}
