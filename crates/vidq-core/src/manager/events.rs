//! Worker event application. Runs on the single event-loop task, so each
//! job's events are applied in emission order.

use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::Inner;
use crate::events::WorkerEvent;
use crate::progress::ProgressUpdate;
use crate::store::{unix_timestamp, JobId, JobState};
use crate::tool::MediaInfo;

static UNSAFE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9A-Za-z._\- ]+").expect("filename pattern"));

/// Collapses anything outside a conservative portable set to `_`.
fn sanitize_component(text: &str) -> String {
    let safe = UNSAFE_FILENAME.replace_all(text, "_");
    let trimmed = safe.trim();
    if trimmed.is_empty() {
        "job".to_string()
    } else {
        trimmed.to_string()
    }
}

impl Inner {
    pub(crate) fn handle_event(self: &Arc<Self>, event: WorkerEvent) {
        match event {
            WorkerEvent::Log { job_id, text } => {
                tracing::info!(job_id, "{text}");
            }
            WorkerEvent::Progress { job_id, update } => self.on_progress(job_id, update),
            WorkerEvent::Info { job_id, info } => self.on_info(job_id, info),
            WorkerEvent::Error { job_id, text } => self.on_error(job_id, text),
            WorkerEvent::Done { job_id } => self.on_done(job_id),
            WorkerEvent::Cancelled { job_id } => self.on_cancelled(job_id),
        }
    }

    fn on_progress(&self, job_id: JobId, update: ProgressUpdate) {
        let mut st = self.lock_state();
        let Some(job) = st.jobs.iter_mut().find(|j| j.id == job_id) else {
            return;
        };
        job.status_text = update.status_line();
        job.state = JobState::Running;
        job.touch(unix_timestamp());
        self.persist(&st);
    }

    /// Applies probe metadata: a nicer title, and a detached thumbnail fetch
    /// through the collaborator (never blocks the event loop).
    fn on_info(self: &Arc<Self>, job_id: JobId, info: MediaInfo) {
        let thumb = info.pick_thumbnail();
        {
            let mut st = self.lock_state();
            let Some(job) = st.jobs.iter_mut().find(|j| j.id == job_id) else {
                return;
            };
            if let Some(title) = &info.title {
                job.title = match &info.uploader {
                    Some(uploader) => format!("[{uploader}] {title}"),
                    None => title.clone(),
                };
                job.touch(unix_timestamp());
                self.persist(&st);
            }
        }

        if let Some((url, content)) = thumb {
            let inner = Arc::clone(self);
            tokio::task::spawn_blocking(move || inner.fetch_thumbnail(job_id, &url, &content));
        }
    }

    /// Resolves the thumbnail URL to a cached file and records its path.
    /// Every failure along the way is silently dropped; preview images are
    /// never load-bearing.
    fn fetch_thumbnail(&self, job_id: JobId, url: &str, content: &str) {
        let Some(bytes) = self.thumbs.fetch(url) else {
            return;
        };
        let dir = self.thumb_dir();
        if std::fs::create_dir_all(&dir).is_err() {
            return;
        }
        let path = dir.join(format!("{}.jpg", sanitize_component(content)));
        if std::fs::write(&path, bytes).is_err() {
            return;
        }

        let mut st = self.lock_state();
        let Some(job) = st.jobs.iter_mut().find(|j| j.id == job_id) else {
            return;
        };
        job.thumb_path = path.display().to_string();
        job.touch(unix_timestamp());
        self.persist(&st);
    }

    fn thumb_dir(&self) -> PathBuf {
        crate::options::ToolOptions::build(&self.cfg, false, &self.app_root)
            .download_dir
            .join(".thumbnails")
    }

    /// Terminal failure: the full diagnostic lands both on the record and in
    /// a per-job log file next to the store.
    fn on_error(&self, job_id: JobId, text: String) {
        tracing::error!(job_id, "download failed: {text}");
        let mut st = self.lock_state();
        let Some(job) = st.jobs.iter_mut().find(|j| j.id == job_id) else {
            return;
        };

        let now = unix_timestamp();
        let log_name = format!(
            "ERROR_{}({})_{}.log",
            sanitize_component(&job.title),
            job.id,
            now
        );
        let log_path = self.log_dir.join(log_name);
        match std::fs::write(&log_path, &text) {
            Ok(()) => job.log_path = log_path.display().to_string(),
            Err(e) => tracing::warn!("could not write error log for job {job_id}: {e}"),
        }

        job.error = text;
        job.state = JobState::Error;
        job.status_text = "Failed".to_string();
        job.touch(now);
        self.persist(&st);
    }

    /// Completion notice. A preceding `Error` is sticky: the record keeps its
    /// failure state and only the worker registration is released.
    fn on_done(&self, job_id: JobId) {
        let mut st = self.lock_state();
        if let Some(job) = st.jobs.iter_mut().find(|j| j.id == job_id) {
            if job.state != JobState::Error {
                if !job.log_path.is_empty() {
                    let _ = std::fs::remove_file(&job.log_path);
                    job.log_path.clear();
                }
                job.error.clear();
                job.state = JobState::Done;
                job.status_text = "Done".to_string();
                job.touch(unix_timestamp());
            }
            self.persist(&st);
        }
        self.unregister_worker(&mut st, job_id);
    }

    /// The worker stopped on the cancellation path: release the registration
    /// and park the record back in the queue.
    fn on_cancelled(&self, job_id: JobId) {
        let mut st = self.lock_state();
        if let Some(job) = st.jobs.iter_mut().find(|j| j.id == job_id) {
            job.state = JobState::Queued;
            job.status_text = "Queued".to_string();
            job.touch(unix_timestamp());
            self.persist(&st);
        }
        self.unregister_worker(&mut st, job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_portable_characters_only() {
        assert_eq!(
            sanitize_component("[Ch] Ep.1 (4K)/60fps"),
            "_Ch_ Ep.1 _4K_60fps"
        );
        assert_eq!(sanitize_component("plain name-1_2.x"), "plain name-1_2.x");
        assert_eq!(sanitize_component("///"), "job");
        assert_eq!(sanitize_component(""), "job");
    }
}
