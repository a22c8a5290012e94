//! Worker → manager event contract.
//!
//! Workers never touch job records or the store; everything crosses this
//! one-way typed channel and is applied on the manager's event loop, in
//! emission order per job.

use crate::progress::ProgressUpdate;
use crate::store::JobId;
use crate::tool::MediaInfo;

#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Diagnostic trace line; passed through to logging, never persisted.
    Log { job_id: JobId, text: String },
    /// Terminal failure with the tool's full diagnostic text.
    Error { job_id: JobId, text: String },
    /// Normalized progress snapshot.
    Progress {
        job_id: JobId,
        update: ProgressUpdate,
    },
    /// Metadata from a successful probe (zero or more per job).
    Info { job_id: JobId, info: MediaInfo },
    /// Worker finished (success, or completion notice after `Error`).
    Done { job_id: JobId },
    /// Worker stopped on the cancellation path; neither success nor failure.
    Cancelled { job_id: JobId },
}

impl WorkerEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            WorkerEvent::Log { job_id, .. }
            | WorkerEvent::Error { job_id, .. }
            | WorkerEvent::Progress { job_id, .. }
            | WorkerEvent::Info { job_id, .. }
            | WorkerEvent::Done { job_id }
            | WorkerEvent::Cancelled { job_id } => *job_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_reports_its_job_id() {
        let events = [
            WorkerEvent::Log {
                job_id: 3,
                text: "t".to_string(),
            },
            WorkerEvent::Error {
                job_id: 3,
                text: "e".to_string(),
            },
            WorkerEvent::Progress {
                job_id: 3,
                update: ProgressUpdate {
                    status: String::new(),
                    percent: 0.0,
                    eta: String::new(),
                    speed: String::new(),
                },
            },
            WorkerEvent::Info {
                job_id: 3,
                info: MediaInfo::default(),
            },
            WorkerEvent::Done { job_id: 3 },
            WorkerEvent::Cancelled { job_id: 3 },
        ];
        for event in events {
            assert_eq!(event.job_id(), 3);
        }
    }
}
