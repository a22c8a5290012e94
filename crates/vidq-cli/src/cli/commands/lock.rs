//! `vidq lock/unlock <id>` – toggle a job's protection.

use anyhow::Result;
use vidq_core::manager::JobManager;
use vidq_core::store::JobId;

pub fn run_lock(manager: &JobManager, id: JobId) -> Result<()> {
    manager.set_locked(id, true)?;
    println!("Locked job {id}.");
    Ok(())
}

pub fn run_unlock(manager: &JobManager, id: JobId) -> Result<()> {
    manager.set_locked(id, false)?;
    println!("Unlocked job {id}.");
    Ok(())
}
