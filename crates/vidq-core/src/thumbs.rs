//! Preview-image collaborator seam.
//!
//! Fetching and rendering thumbnails belongs to the presentation layer; the
//! engine only asks a `ThumbnailFetcher` for bytes and records where the
//! cached copy lives on the job.

/// External collaborator that resolves a thumbnail URL to image bytes.
/// Implementations may block; the manager calls this off the event loop.
pub trait ThumbnailFetcher: Send + Sync {
    /// Returns the image bytes, or `None` when unavailable. Failures are
    /// never fatal to the job.
    fn fetch(&self, url: &str) -> Option<Vec<u8>>;
}

/// Default collaborator for headless use: fetches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThumbnails;

impl ThumbnailFetcher for NoThumbnails {
    fn fetch(&self, _url: &str) -> Option<Vec<u8>> {
        None
    }
}
