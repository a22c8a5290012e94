//! Postprocessing pipeline stages, in an order-significant sequence.

use serde::{Deserialize, Serialize};

/// One stage of the external tool's postprocessing pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Postprocessor {
    /// Re-encode/extract the audio track into the target codec. Must run
    /// before any embedding stage, so it is always prepended.
    ExtractAudio {
        codec: String,
        /// Preferred bitrate (e.g. "192"), when the quality label was numeric.
        quality: Option<String>,
    },
    EmbedSubtitle,
    EmbedThumbnail,
    /// Tag metadata and/or chapters into the output container.
    Metadata { chapters: bool, tags: bool },
    /// Query the content-skip service and record matching segments.
    SponsorBlock {
        categories: Vec<String>,
        api_url: Option<String>,
    },
    /// Cut the recorded segments out of the output.
    ModifyChapters { remove_categories: Vec<String> },
}
