//! Job Manager: owns the job collection, spawns workers, applies their
//! events, and persists after every mutation.
//!
//! Concurrency model: all job records live behind one mutex that is never
//! held across an await point. Workers run on the blocking pool and report
//! through an unbounded event channel consumed by a single loop task, so
//! every job mutation is applied in emission order.

mod events;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::control::CancelToken;
use crate::events::WorkerEvent;
use crate::options::ToolOptions;
use crate::store::{sort_jobs, unix_timestamp, Job, JobId, JobState, JobStore};
use crate::thumbs::ThumbnailFetcher;
use crate::tool::MediaTool;
use crate::url_model::{content_id, is_playlist_url, normalize_url};
use crate::worker::{self, WorkerContext};

/// Grace period for a cancelled worker before `delete` stops waiting.
const CANCEL_WAIT: Duration = Duration::from_secs(2);

struct WorkerHandle {
    cancel: CancelToken,
    task: JoinHandle<()>,
}

struct ManagerState {
    jobs: Vec<Job>,
    workers: HashMap<JobId, WorkerHandle>,
    next_id: JobId,
}

pub(crate) struct Inner {
    cfg: AppConfig,
    store: JobStore,
    /// Directory for per-job error logs; lives next to the store file.
    log_dir: PathBuf,
    app_root: PathBuf,
    tool: Arc<dyn MediaTool>,
    thumbs: Arc<dyn ThumbnailFetcher>,
    events_tx: UnboundedSender<WorkerEvent>,
    state: Mutex<ManagerState>,
    /// Signalled on every worker unregistration; drives `wait_idle`.
    idle: Notify,
}

/// Handle to the engine. Cheap to clone; all clones share one collection.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<Inner>,
}

impl JobManager {
    /// Loads the persisted collection and starts the event loop.
    /// Must be called inside a tokio runtime.
    pub fn new(
        cfg: AppConfig,
        store: JobStore,
        tool: Arc<dyn MediaTool>,
        thumbs: Arc<dyn ThumbnailFetcher>,
        app_root: PathBuf,
    ) -> Self {
        let jobs = store.load(cfg.list_sort_desc);
        let next_id = jobs.iter().map(|j| j.id).max().unwrap_or(0) + 1;
        let log_dir = store
            .path()
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            cfg,
            store,
            log_dir,
            app_root,
            tool,
            thumbs,
            events_tx,
            state: Mutex::new(ManagerState {
                jobs,
                workers: HashMap::new(),
                next_id,
            }),
            idle: Notify::new(),
        });
        tokio::spawn(event_loop(Arc::clone(&inner), events_rx));
        Self { inner }
    }

    /// Snapshot of all jobs in display order.
    pub fn jobs(&self) -> Vec<Job> {
        let mut jobs = self.inner.lock_state().jobs.clone();
        sort_jobs(&mut jobs, self.inner.cfg.list_sort_desc);
        jobs
    }

    pub fn job(&self, id: JobId) -> Option<Job> {
        self.inner
            .lock_state()
            .jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
    }

    /// Creates one job from the given URLs, suppressing any URL whose content
    /// id is already held by a queued, running, or finished job (failed jobs
    /// release their ids). Returns `None` when every URL was suppressed.
    pub fn submit(&self, urls: &[String]) -> Option<JobId> {
        let inner = &self.inner;
        let (job, suppressed) = {
            // Dedup check and insert happen in one critical section so two
            // concurrent submissions cannot both claim the same content id.
            let mut st = inner.lock_state();
            let mut occupied: std::collections::HashSet<String> = st
                .jobs
                .iter()
                .filter(|j| j.occupies_content())
                .flat_map(|j| j.urls.iter())
                .filter_map(|u| content_id(u))
                .collect();

            let mut survivors = Vec::new();
            let mut suppressed = 0usize;
            for raw in urls {
                let url = normalize_url(raw);
                if let Some(id) = content_id(&url) {
                    if !occupied.insert(id) {
                        suppressed += 1;
                        continue;
                    }
                }
                survivors.push(url);
            }
            if survivors.is_empty() {
                drop(st);
                if suppressed > 0 {
                    tracing::info!("all {suppressed} URLs already tracked, nothing to add");
                }
                return None;
            }

            let title = if survivors.len() == 1 {
                survivors[0].clone()
            } else {
                format!("Batch of {} URLs", survivors.len())
            };
            let id = st.next_id;
            st.next_id += 1;
            let job = Job::new(id, title, survivors, unix_timestamp());
            st.jobs.push(job.clone());
            inner.persist(&st);
            (job, suppressed)
        };

        if suppressed > 0 {
            tracing::info!(job_id = job.id, "suppressed {suppressed} duplicate URLs");
        }
        inner.spawn_worker(&job);
        Some(job.id)
    }

    /// Re-runs a finished or failed job from scratch.
    pub fn restart(&self, id: JobId) -> Result<()> {
        let inner = &self.inner;
        let job = {
            let mut st = inner.lock_state();
            if st.workers.contains_key(&id) {
                bail!("job {id} is still running");
            }
            let Some(job) = st.jobs.iter_mut().find(|j| j.id == id) else {
                bail!("no job with id {id}");
            };
            if job.locked {
                bail!("job {id} is locked");
            }
            if job.urls.is_empty() {
                bail!("job {id} has no URLs");
            }

            job.urls = job.urls.iter().map(|u| normalize_url(u)).collect();
            job.state = JobState::Queued;
            job.status_text = "Queued".to_string();
            job.error.clear();
            if !job.log_path.is_empty() {
                let _ = std::fs::remove_file(&job.log_path);
                job.log_path.clear();
            }
            job.touch(unix_timestamp());
            let job = job.clone();
            inner.persist(&st);
            job
        };
        inner.spawn_worker(&job);
        Ok(())
    }

    /// Restarts every unlocked job that has not finished. Individual
    /// rejections (still running) are logged and skipped.
    pub fn restart_incomplete(&self) -> usize {
        let candidates: Vec<JobId> = {
            let st = self.inner.lock_state();
            st.jobs
                .iter()
                .filter(|j| !j.locked && j.state != JobState::Done)
                .map(|j| j.id)
                .collect()
        };
        let mut restarted = 0;
        for id in candidates {
            match self.restart(id) {
                Ok(()) => restarted += 1,
                Err(e) => tracing::debug!("skipping restart of job {id}: {e}"),
            }
        }
        restarted
    }

    /// Spawns a worker for every queued job without one. Returns the number
    /// of workers started.
    pub fn start_queued(&self) -> usize {
        let ready: Vec<Job> = {
            let st = self.inner.lock_state();
            st.jobs
                .iter()
                .filter(|j| j.state == JobState::Queued && !st.workers.contains_key(&j.id))
                .cloned()
                .collect()
        };
        for job in &ready {
            self.inner.spawn_worker(job);
        }
        ready.len()
    }

    /// Drops every unlocked finished job. Returns the number removed.
    pub fn remove_completed(&self) -> usize {
        let mut st = self.inner.lock_state();
        let before = st.jobs.len();
        st.jobs
            .retain(|j| j.locked || j.state != JobState::Done);
        let removed = before - st.jobs.len();
        if removed > 0 {
            self.inner.persist(&st);
        }
        removed
    }

    /// Cancels the job's worker if one is active, waits briefly for it to
    /// wind down, then removes the record. The record goes away even when
    /// the worker outlives the grace period.
    pub async fn delete(&self, id: JobId) -> Result<()> {
        let handle = {
            let mut st = self.inner.lock_state();
            match st.jobs.iter().find(|j| j.id == id) {
                None => bail!("no job with id {id}"),
                Some(job) if job.locked => bail!("job {id} is locked"),
                Some(_) => {}
            }
            st.workers.remove(&id)
        };

        if let Some(handle) = handle {
            handle.cancel.cancel();
            if tokio::time::timeout(CANCEL_WAIT, handle.task).await.is_err() {
                tracing::warn!("worker for job {id} did not stop in time, removing anyway");
            }
            self.inner.idle.notify_waiters();
        }

        let mut st = self.inner.lock_state();
        if let Some(job) = st.jobs.iter().find(|j| j.id == id) {
            if !job.log_path.is_empty() {
                let _ = std::fs::remove_file(&job.log_path);
            }
        }
        st.jobs.retain(|j| j.id != id);
        self.inner.persist(&st);
        Ok(())
    }

    pub fn set_locked(&self, id: JobId, locked: bool) -> Result<()> {
        let mut st = self.inner.lock_state();
        let Some(job) = st.jobs.iter_mut().find(|j| j.id == id) else {
            bail!("no job with id {id}");
        };
        job.locked = locked;
        job.touch(unix_timestamp());
        self.inner.persist(&st);
        Ok(())
    }

    /// Resolves once no worker is registered. Terminal events for every
    /// worker have already been applied by then.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.lock_state().workers.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Full-collection rewrite; persistence failures degrade to a warning so
    /// an unwritable disk never stalls the engine.
    fn persist(&self, st: &ManagerState) {
        if let Err(e) = self.store.save(&st.jobs) {
            tracing::warn!("failed to persist job store: {e}");
        }
    }

    fn spawn_worker(&self, job: &Job) {
        let allow_playlist = job.urls.iter().any(|u| is_playlist_url(u));
        let ctx = WorkerContext {
            job_id: job.id,
            urls: job.urls.clone(),
            options: ToolOptions::build(&self.cfg, allow_playlist, &self.app_root),
            output_format: self.cfg.output_format.clone(),
            max_attempts: self.cfg.effective_max_attempts(),
        };
        let cancel = CancelToken::new();
        let mut st = self.lock_state();
        if st.workers.contains_key(&job.id) {
            tracing::warn!("job {} already has a worker, not spawning", job.id);
            return;
        }
        let task = worker::spawn(
            ctx,
            Arc::clone(&self.tool),
            self.events_tx.clone(),
            cancel.clone(),
        );
        st.workers.insert(job.id, WorkerHandle { cancel, task });
    }

    fn unregister_worker(&self, st: &mut ManagerState, id: JobId) {
        st.workers.remove(&id);
        self.idle.notify_waiters();
    }
}

async fn event_loop(inner: Arc<Inner>, mut rx: UnboundedReceiver<WorkerEvent>) {
    while let Some(event) = rx.recv().await {
        tracing::trace!(job_id = event.job_id(), "applying worker event");
        inner.handle_event(event);
    }
}
