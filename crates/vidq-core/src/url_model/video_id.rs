//! Stable content identifiers for duplicate suppression.

/// Extracts the stable content identifier from a canonical URL.
///
/// Bare videos, shorts and embeds all map to the same video id; playlist
/// pages map to a `playlist:`-prefixed key so a playlist never collides with
/// a video of the same id. Returns `None` when no identifier can be derived.
pub fn content_id(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let path = parsed.path();

    if host.contains("youtu.be") {
        let id = path.trim_start_matches('/').split('/').next().unwrap_or("");
        return non_empty(id);
    }
    if host.contains("youtube.com") {
        if path == "/watch" {
            let v = parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())?;
            return non_empty(&v);
        }
        if let Some(rest) = path.strip_prefix("/shorts/") {
            return non_empty(rest.split('/').next().unwrap_or(""));
        }
        if let Some(rest) = path.strip_prefix("/embed/") {
            return non_empty(rest.split('/').next().unwrap_or(""));
        }
        if path == "/playlist" {
            let list = parsed
                .query_pairs()
                .find(|(k, _)| k == "list")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            return Some(format!("playlist:{list}"));
        }
    }
    None
}

/// True for playlist pages (`youtube.com/playlist?list=...`).
pub fn is_playlist_url(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str().map(str::to_ascii_lowercase) else {
        return false;
    };
    host.contains("youtube.com")
        && parsed.path() == "/playlist"
        && parsed.query_pairs().any(|(k, _)| k == "list")
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
