//! Source URL modeling: submission parsing, canonicalization, content ids.
//!
//! Equivalent links (watch/short/embed/share variants, playlist-tagged video
//! links) are rewritten to one canonical form so they compare equal, and a
//! stable content identifier is extracted for duplicate suppression.

mod input;
mod normalize;
mod video_id;

pub use input::parse_input_text;
pub use normalize::normalize_url;
pub use video_id::{content_id, is_playlist_url};

/// True when the host belongs to a recognized source domain.
pub(crate) fn is_known_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host.contains("youtube.com") || host.contains("youtu.be")
}
