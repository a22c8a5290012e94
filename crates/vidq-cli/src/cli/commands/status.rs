//! `vidq status` – show all jobs.

use anyhow::Result;
use vidq_core::manager::JobManager;

pub fn run_status(manager: &JobManager, with_urls: bool) -> Result<()> {
    let jobs = manager.jobs();
    if jobs.is_empty() {
        println!("No jobs.");
        return Ok(());
    }

    println!(
        "{:<6} {:<8} {:<5} {:<40} {}",
        "ID", "STATE", "LOCK", "TITLE", "STATUS"
    );
    for job in jobs {
        let lock = if job.locked { "yes" } else { "-" };
        println!(
            "{:<6} {:<8} {:<5} {:<40} {}",
            job.id,
            job.state.as_str(),
            lock,
            truncate(&job.title, 40),
            job.status_text
        );
        if with_urls {
            for url in &job.urls {
                println!("       {url}");
            }
        }
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
