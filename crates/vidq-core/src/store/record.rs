//! Job record types persisted by the store.

use serde::{Deserialize, Serialize};

/// Job identifier: monotonically assigned, never reused in-process.
pub type JobId = i64;

/// Delimiter for the serialized URL list; never occurs in a valid URL.
pub const URL_DELIMITER: char = '|';

/// High-level job state, stored as a lowercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    #[default]
    Queued,
    Running,
    Done,
    Error,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Error => "error",
        }
    }

    /// Unknown strings (including from newer versions) default to `Queued`
    /// so old binaries keep loading newer store files.
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => JobState::Queued,
            "running" => JobState::Running,
            "done" => JobState::Done,
            "error" => JobState::Error,
            _ => JobState::Queued,
        }
    }
}

impl From<String> for JobState {
    fn from(s: String) -> Self {
        JobState::parse(&s)
    }
}

impl From<JobState> for String {
    fn from(s: JobState) -> Self {
        s.as_str().to_string()
    }
}

/// One tracked download job. Owned exclusively by the manager; the UI and
/// the store see read-only copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default)]
    pub title: String,
    /// Human-readable progress/status summary.
    #[serde(rename = "status", default)]
    pub status_text: String,
    #[serde(default)]
    pub state: JobState,
    /// Locked jobs refuse restart/delete/remove-completed until unlocked.
    #[serde(default)]
    pub locked: bool,
    #[serde(with = "urls_delimited", default)]
    pub urls: Vec<String>,
    /// Full diagnostic of the last failure; empty unless `state == Error`.
    #[serde(default)]
    pub error: String,
    /// Unix seconds; fixed at creation.
    #[serde(default)]
    pub created_at: i64,
    /// Unix seconds; refreshed on every mutation.
    #[serde(default)]
    pub updated_at: i64,
    /// Path of the persisted diagnostic log; set only while in `Error`.
    #[serde(default)]
    pub log_path: String,
    /// Path of the cached preview image, once available.
    #[serde(default)]
    pub thumb_path: String,
}

impl Job {
    pub fn new(id: JobId, title: String, urls: Vec<String>, now: i64) -> Self {
        Self {
            id,
            title,
            status_text: "Queued".to_string(),
            state: JobState::Queued,
            locked: false,
            urls,
            error: String::new(),
            created_at: now,
            updated_at: now,
            log_path: String::new(),
            thumb_path: String::new(),
        }
    }

    pub fn touch(&mut self, now: i64) {
        self.updated_at = now;
    }

    /// States whose content identifiers suppress resubmission. Dedup
    /// persists past completion: Done still counts.
    pub fn occupies_content(&self) -> bool {
        matches!(
            self.state,
            JobState::Queued | JobState::Running | JobState::Done
        )
    }
}

/// Order-preserving `|`-joined URL list.
mod urls_delimited {
    use super::URL_DELIMITER;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(urls: &[String], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&urls.join(&URL_DELIMITER.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
        let joined = String::deserialize(de)?;
        Ok(joined
            .split(URL_DELIMITER)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}
