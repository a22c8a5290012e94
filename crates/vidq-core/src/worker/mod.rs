//! Download Worker: drives one job's external-tool invocations to
//! completion, failure, or cancellation.
//!
//! The whole attempt loop is blocking and runs on the blocking thread pool;
//! the worker talks to the manager only through `WorkerEvent` messages.

mod cleanup;

pub use cleanup::cleanup_partial_files;

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::control::CancelToken;
use crate::events::WorkerEvent;
use crate::options::ToolOptions;
use crate::progress::{ProgressUpdate, RawProgress};
use crate::store::JobId;
use crate::tool::MediaTool;

/// Everything a worker needs for one job; built by the manager.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub job_id: JobId,
    pub urls: Vec<String>,
    pub options: ToolOptions,
    /// Target container; decides the flavor of the fallback selector.
    pub output_format: String,
    /// Attempts including the first; clamped to at least one.
    pub max_attempts: u32,
}

/// Spawns the worker on the blocking pool. The caller keeps a clone of
/// `cancel` to request cooperative cancellation.
pub fn spawn(
    ctx: WorkerContext,
    tool: Arc<dyn MediaTool>,
    events: UnboundedSender<WorkerEvent>,
    cancel: CancelToken,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || run(ctx, tool.as_ref(), &events, &cancel))
}

/// Execution protocol for one job.
///
/// Per attempt: probe every URL (failures are swallowed at debug level),
/// then download all URLs in one call. A "format unavailable" failure
/// rewrites the options once per job and retries immediately without
/// consuming an attempt. Cancellation wins over retry at every boundary and
/// ends in cleanup with neither `Done` nor `Error`; a terminal failure emits
/// `Error` before the closing `Done` notice.
fn run(
    ctx: WorkerContext,
    tool: &dyn MediaTool,
    events: &UnboundedSender<WorkerEvent>,
    cancel: &CancelToken,
) {
    let job_id = ctx.job_id;
    let mut opts = ctx.options;
    let max_attempts = ctx.max_attempts.max(1);

    let send_log = |text: String| {
        let _ = events.send(WorkerEvent::Log { job_id, text });
    };
    send_log(format!("format={}", opts.format.as_deref().unwrap_or("")));
    send_log(format!(
        "merge_output_format={}",
        opts.merge_output_format.as_deref().unwrap_or("")
    ));

    let mut last_err: Option<String> = None;
    let mut fallback_used = false;
    let mut cancelled = false;
    let mut current_filename: Option<String> = None;

    'attempts: for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        for url in &ctx.urls {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'attempts;
            }
            match tool.probe(&opts, url, cancel) {
                Ok(info) => {
                    let _ = events.send(WorkerEvent::Info { job_id, info });
                }
                Err(e) if e.is_cancelled() => {
                    cancelled = true;
                    break 'attempts;
                }
                Err(e) => {
                    tracing::debug!(job_id, %url, "metadata probe failed: {e}");
                }
            }
        }

        let mut on_progress = |raw: RawProgress| {
            if let Some(name) = &raw.filename {
                current_filename = Some(name.clone());
            }
            let _ = events.send(WorkerEvent::Progress {
                job_id,
                update: ProgressUpdate::from_raw(&raw),
            });
        };

        match tool.download(&opts, &ctx.urls, &mut on_progress, cancel) {
            Ok(()) => {
                last_err = None;
                break;
            }
            Err(e) if e.is_cancelled() => {
                cancelled = true;
                break;
            }
            Err(e) => {
                let mut diagnostic = e.diagnostic().to_string();
                if !fallback_used && e.is_format_unavailable() {
                    // One-time rewrite; this extra try is free w.r.t. attempts.
                    opts.apply_format_fallback(&ctx.output_format);
                    fallback_used = true;
                    send_log("Fallback format: best".to_string());
                    match tool.download(&opts, &ctx.urls, &mut on_progress, cancel) {
                        Ok(()) => {
                            last_err = None;
                            break;
                        }
                        Err(e2) if e2.is_cancelled() => {
                            cancelled = true;
                            break;
                        }
                        Err(e2) => diagnostic = e2.diagnostic().to_string(),
                    }
                }
                last_err = Some(diagnostic);
                if attempt < max_attempts {
                    send_log(format!("Retrying download ({attempt}/{max_attempts})"));
                    continue;
                }
                break;
            }
        }
    }

    if cancelled {
        for path in cleanup_partial_files(&opts.download_dir, current_filename.as_deref()) {
            send_log(format!(
                "Cleaned up: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            ));
        }
        send_log("Download cancelled".to_string());
        let _ = events.send(WorkerEvent::Cancelled { job_id });
        return;
    }

    if let Some(text) = last_err {
        let _ = events.send(WorkerEvent::Error { job_id, text });
    }
    let _ = events.send(WorkerEvent::Done { job_id });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::tool::{MediaInfo, ToolError, FORMAT_UNAVAILABLE_SIGNATURE};
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    enum Step {
        Ok,
        Fail(&'static str),
        FailFormat,
        /// Emit a progress event carrying `filename`, flip the cancel flag,
        /// then report the cancelled outcome.
        CancelWith(String),
    }

    #[derive(Default)]
    struct FakeTool {
        probe_failures: Mutex<u32>,
        downloads: Mutex<VecDeque<Step>>,
        formats_seen: Mutex<Vec<String>>,
    }

    impl FakeTool {
        fn scripted(steps: Vec<Step>) -> Self {
            Self {
                downloads: Mutex::new(steps.into()),
                ..Default::default()
            }
        }

        fn download_calls(&self) -> usize {
            self.formats_seen.lock().unwrap().len()
        }
    }

    impl MediaTool for FakeTool {
        fn probe(
            &self,
            _opts: &ToolOptions,
            url: &str,
            _cancel: &CancelToken,
        ) -> Result<MediaInfo, ToolError> {
            let mut failures = self.probe_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ToolError::Failed("probe blew up".to_string()));
            }
            Ok(MediaInfo {
                id: Some(url.to_string()),
                title: Some(format!("title of {url}")),
                uploader: Some("someone".to_string()),
                ..Default::default()
            })
        }

        fn download(
            &self,
            opts: &ToolOptions,
            _urls: &[String],
            on_progress: &mut dyn FnMut(RawProgress),
            cancel: &CancelToken,
        ) -> Result<(), ToolError> {
            self.formats_seen
                .lock()
                .unwrap()
                .push(opts.format.clone().unwrap_or_default());
            match self.downloads.lock().unwrap().pop_front() {
                None | Some(Step::Ok) => Ok(()),
                Some(Step::Fail(text)) => Err(ToolError::Failed(text.to_string())),
                Some(Step::FailFormat) => Err(ToolError::Failed(format!(
                    "ERROR: {FORMAT_UNAVAILABLE_SIGNATURE}"
                ))),
                Some(Step::CancelWith(filename)) => {
                    on_progress(RawProgress {
                        status: "downloading".to_string(),
                        filename: Some(filename),
                        percent_str: Some("10%".to_string()),
                        ..Default::default()
                    });
                    cancel.cancel();
                    Err(ToolError::Cancelled)
                }
            }
        }
    }

    fn ctx(max_attempts: u32, download_dir: &Path) -> WorkerContext {
        let mut cfg = AppConfig::default();
        cfg.download_dir = download_dir.display().to_string();
        WorkerContext {
            job_id: 1,
            urls: vec!["https://youtu.be/abc".to_string()],
            options: ToolOptions::build(&cfg, false, Path::new("/")),
            output_format: cfg.output_format.clone(),
            max_attempts,
        }
    }

    fn run_and_collect(
        ctx: WorkerContext,
        tool: &FakeTool,
        cancel: &CancelToken,
    ) -> Vec<WorkerEvent> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        run(ctx, tool, &tx, cancel);
        drop(tx);
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn retry_logs(events: &[WorkerEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, WorkerEvent::Log { text, .. } if text.starts_with("Retrying download")))
            .count()
    }

    fn has_log(events: &[WorkerEvent], needle: &str) -> bool {
        events
            .iter()
            .any(|e| matches!(e, WorkerEvent::Log { text, .. } if text.contains(needle)))
    }

    #[test]
    fn success_emits_info_then_done() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FakeTool::scripted(vec![Step::Ok]);
        let events = run_and_collect(ctx(1, dir.path()), &tool, &CancelToken::new());

        assert!(events.iter().any(|e| matches!(e, WorkerEvent::Info { .. })));
        assert!(matches!(events.last(), Some(WorkerEvent::Done { .. })));
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::Error { .. })));
    }

    #[test]
    fn two_failures_then_success_logs_two_retries() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FakeTool::scripted(vec![
            Step::Fail("ERROR: transient"),
            Step::Fail("ERROR: transient"),
            Step::Ok,
        ]);
        let events = run_and_collect(ctx(3, dir.path()), &tool, &CancelToken::new());

        assert_eq!(retry_logs(&events), 2);
        assert!(has_log(&events, "Retrying download (1/3)"));
        assert!(has_log(&events, "Retrying download (2/3)"));
        assert!(matches!(events.last(), Some(WorkerEvent::Done { .. })));
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::Error { .. })));
        assert_eq!(tool.download_calls(), 3);
    }

    #[test]
    fn attempts_exhausted_emits_error_with_last_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FakeTool::scripted(vec![
            Step::Fail("ERROR: first"),
            Step::Fail("ERROR: second"),
        ]);
        let events = run_and_collect(ctx(2, dir.path()), &tool, &CancelToken::new());

        let error_text = events.iter().find_map(|e| match e {
            WorkerEvent::Error { text, .. } => Some(text.clone()),
            _ => None,
        });
        assert_eq!(error_text.as_deref(), Some("ERROR: second"));
        // Completion notice still follows the error.
        assert!(matches!(events.last(), Some(WorkerEvent::Done { .. })));
        assert_eq!(retry_logs(&events), 1);
    }

    #[test]
    fn format_fallback_retries_once_without_consuming_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FakeTool::scripted(vec![Step::FailFormat, Step::Ok]);
        let events = run_and_collect(ctx(1, dir.path()), &tool, &CancelToken::new());

        assert!(has_log(&events, "Fallback format: best"));
        assert_eq!(retry_logs(&events), 0);
        assert!(matches!(events.last(), Some(WorkerEvent::Done { .. })));
        assert_eq!(tool.download_calls(), 2);
        let formats = tool.formats_seen.lock().unwrap().clone();
        assert_eq!(formats[1], "best");
    }

    #[test]
    fn fallback_applies_at_most_once_per_job() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FakeTool::scripted(vec![
            Step::FailFormat,
            Step::FailFormat,
            Step::FailFormat,
        ]);
        let events = run_and_collect(ctx(2, dir.path()), &tool, &CancelToken::new());

        // Attempt 1: failure + free fallback try. Attempt 2: plain failure,
        // no second rewrite even though the signature matched again.
        assert_eq!(tool.download_calls(), 3);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, WorkerEvent::Log { text, .. } if text == "Fallback format: best"))
                .count(),
            1
        );
        assert_eq!(retry_logs(&events), 1);
        assert!(events.iter().any(|e| matches!(e, WorkerEvent::Error { .. })));
    }

    #[test]
    fn cancellation_cleans_partials_and_skips_done_and_error() {
        let dir = tempfile::tempdir().unwrap();
        let in_flight = dir.path().join("clip.mp4");
        std::fs::write(dir.path().join("clip.mp4.part"), b"x").unwrap();
        std::fs::write(dir.path().join("clip.f137.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("done.mkv"), b"x").unwrap();

        let tool = FakeTool::scripted(vec![Step::CancelWith(
            in_flight.to_string_lossy().into_owned(),
        )]);
        let events = run_and_collect(ctx(3, dir.path()), &tool, &CancelToken::new());

        assert!(has_log(&events, "Download cancelled"));
        assert!(matches!(events.last(), Some(WorkerEvent::Cancelled { .. })));
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::Done { .. })));
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::Error { .. })));
        // Retry never fires after cancellation.
        assert_eq!(retry_logs(&events), 0);
        assert!(!dir.path().join("clip.mp4.part").exists());
        assert!(!dir.path().join("clip.f137.mp4").exists());
        assert!(dir.path().join("done.mkv").exists());
    }

    #[test]
    fn pre_cancelled_worker_never_calls_the_tool() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FakeTool::scripted(vec![Step::Ok]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let events = run_and_collect(ctx(3, dir.path()), &tool, &cancel);

        assert_eq!(tool.download_calls(), 0);
        assert!(matches!(events.last(), Some(WorkerEvent::Cancelled { .. })));
    }

    #[test]
    fn probe_failures_are_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FakeTool {
            probe_failures: Mutex::new(1),
            downloads: Mutex::new(VecDeque::from([Step::Ok])),
            ..Default::default()
        };
        let events = run_and_collect(ctx(1, dir.path()), &tool, &CancelToken::new());

        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::Info { .. })));
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::Error { .. })));
        assert!(matches!(events.last(), Some(WorkerEvent::Done { .. })));
    }
}
