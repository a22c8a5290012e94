//! External extraction-tool seam.
//!
//! The engine depends only on the `MediaTool` trait: an options value goes in,
//! progress events come back through a hook, and failures carry the tool's
//! full diagnostic text. `ytdlp` provides a subprocess-backed adapter.

pub mod ytdlp;

use crate::control::CancelToken;
use crate::options::ToolOptions;
use crate::progress::RawProgress;
use serde::{Deserialize, Serialize};

pub use ytdlp::YtDlpTool;

/// Diagnostic signature of a "requested format unavailable" failure; triggers
/// the one-time fallback rewrite in the worker.
pub const FORMAT_UNAVAILABLE_SIGNATURE: &str = "Requested format is not available";

/// Outcome of one tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The cooperative cancel flag was observed at a callback boundary.
    /// Not an error from the user's point of view.
    #[error("cancelled by user")]
    Cancelled,
    /// The invocation failed; carries the full diagnostic text.
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled)
    }

    /// True when the diagnostic matches the format-unavailable signature.
    pub fn is_format_unavailable(&self) -> bool {
        match self {
            ToolError::Failed(text) => text.contains(FORMAT_UNAVAILABLE_SIGNATURE),
            ToolError::Cancelled => false,
        }
    }

    /// Full diagnostic text ("" for cancellation).
    pub fn diagnostic(&self) -> &str {
        match self {
            ToolError::Failed(text) => text,
            ToolError::Cancelled => "",
        }
    }
}

/// Metadata for one probed playlist entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}

/// Parsed result of a non-downloading metadata probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub entries: Vec<MediaEntry>,
}

impl MediaInfo {
    /// Picks the preview-image candidate: the first playlist entry carrying a
    /// thumbnail, else the top-level thumbnail. Returns (url, content id).
    pub fn pick_thumbnail(&self) -> Option<(String, String)> {
        for entry in &self.entries {
            if let Some(thumb) = &entry.thumbnail {
                return Some((thumb.clone(), entry.id.clone().unwrap_or_default()));
            }
        }
        self.thumbnail
            .as_ref()
            .map(|t| (t.clone(), self.id.clone().unwrap_or_default()))
    }
}

/// External extraction/download tool contract.
///
/// Both calls are blocking; the worker runs them inside `spawn_blocking`.
/// Implementations observe `cancel` at bounded intervals (each progress
/// callback at the latest) and return `ToolError::Cancelled` rather than
/// treating an abort as a failure.
pub trait MediaTool: Send + Sync {
    /// Non-downloading metadata probe for a single URL.
    fn probe(
        &self,
        opts: &ToolOptions,
        url: &str,
        cancel: &CancelToken,
    ) -> Result<MediaInfo, ToolError>;

    /// Downloads all URLs in one session, reporting progress through the hook.
    fn download(
        &self,
        opts: &ToolOptions,
        urls: &[String],
        on_progress: &mut dyn FnMut(RawProgress),
        cancel: &CancelToken,
    ) -> Result<(), ToolError>;
}
