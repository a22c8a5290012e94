//! `vidq run` – process queued jobs until the queue drains.

use anyhow::Result;
use vidq_core::manager::JobManager;

pub async fn run_run(manager: &JobManager, incomplete: bool) -> Result<()> {
    let mut started = manager.start_queued();
    if incomplete {
        started += manager.restart_incomplete();
    }
    if started == 0 {
        println!("Nothing to run.");
        return Ok(());
    }
    println!("Running {started} job(s)...");
    manager.wait_idle().await;

    for job in manager.jobs() {
        println!("{:<6} {}", job.id, job.status_text);
    }
    Ok(())
}
