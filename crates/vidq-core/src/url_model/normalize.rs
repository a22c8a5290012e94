//! Canonical URL rewriting.

/// Rewrites known link variants to a single canonical form. Idempotent;
/// unparsable input is returned unchanged.
///
/// - `youtube.com/playlist?list=L` stays as-is (the playlist is the content);
/// - `youtu.be/<id>?list=L` drops the query (the bare video is the content);
/// - `youtube.com/watch?v=<id>&list=L&...` keeps only `v`.
pub fn normalize_url(raw: &str) -> String {
    let Ok(parsed) = url::Url::parse(raw) else {
        return raw.to_string();
    };
    let Some(host) = parsed.host_str().map(str::to_ascii_lowercase) else {
        return raw.to_string();
    };

    let has_list = parsed.query_pairs().any(|(k, _)| k == "list");

    if host.contains("youtube.com") && parsed.path() == "/playlist" {
        return raw.to_string();
    }

    if host.contains("youtu.be") && has_list {
        return format!("{}://{}{}", parsed.scheme(), host_port(&parsed), parsed.path());
    }

    if host.contains("youtube.com") && parsed.path() == "/watch" && has_list {
        let v = parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        if !v.is_empty() {
            return format!(
                "{}://{}{}?v={}",
                parsed.scheme(),
                host_port(&parsed),
                parsed.path(),
                v
            );
        }
    }

    raw.to_string()
}

fn host_port(u: &url::Url) -> String {
    match (u.host_str(), u.port()) {
        (Some(h), Some(p)) => format!("{h}:{p}"),
        (Some(h), None) => h.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_page_untouched() {
        let url = "https://www.youtube.com/playlist?list=PL123";
        assert_eq!(normalize_url(url), url);
    }

    #[test]
    fn short_link_drops_playlist_query() {
        assert_eq!(
            normalize_url("https://youtu.be/abc123DEF45?list=PL1&t=10"),
            "https://youtu.be/abc123DEF45"
        );
    }

    #[test]
    fn watch_with_list_keeps_only_video_id() {
        assert_eq!(
            normalize_url("https://www.youtube.com/watch?v=abc123DEF45&list=PL1&index=4"),
            "https://www.youtube.com/watch?v=abc123DEF45"
        );
    }

    #[test]
    fn plain_watch_untouched() {
        let url = "https://www.youtube.com/watch?v=abc123DEF45";
        assert_eq!(normalize_url(url), url);
    }

    #[test]
    fn idempotent() {
        let once = normalize_url("https://youtu.be/abc?list=PL1");
        assert_eq!(normalize_url(&once), once);
    }

    #[test]
    fn garbage_passes_through() {
        assert_eq!(normalize_url("not a url"), "not a url");
    }
}
