//! `vidq clear` – drop all finished jobs.

use anyhow::Result;
use vidq_core::manager::JobManager;

pub fn run_clear(manager: &JobManager) -> Result<()> {
    let removed = manager.remove_completed();
    println!("Removed {removed} finished job(s).");
    Ok(())
}
