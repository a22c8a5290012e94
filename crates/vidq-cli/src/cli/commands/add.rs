//! `vidq add [urls..] [--file path]` – submit URLs and run the job.

use anyhow::{bail, Context, Result};
use std::path::Path;
use vidq_core::manager::JobManager;
use vidq_core::url_model::parse_input_text;

pub async fn run_add(manager: &JobManager, urls: &[String], file: Option<&Path>) -> Result<()> {
    let mut text = urls.join("\n");
    if let Some(path) = file {
        let imported = std::fs::read_to_string(path)
            .with_context(|| format!("read URL file {}", path.display()))?;
        text.push('\n');
        text.push_str(&imported);
    }

    let parsed = parse_input_text(&text);
    if parsed.is_empty() {
        bail!("no valid video or playlist URLs in the input");
    }

    match manager.submit(&parsed) {
        Some(id) => {
            let job = manager.job(id).context("job vanished after submit")?;
            println!("Added job {id}: {} ({} URLs)", job.title, job.urls.len());
            manager.wait_idle().await;
            let job = manager.job(id).context("job vanished while running")?;
            println!("Job {id}: {}", job.status_text);
        }
        None => println!("All URLs are already tracked; nothing to add."),
    }
    Ok(())
}
