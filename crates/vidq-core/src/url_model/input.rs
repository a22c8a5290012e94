//! Submission-surface parsing: free text or file contents to accepted URLs.

use super::is_known_host;

/// Tokenizes multi-line free text on whitespace/newlines and keeps only
/// http/https URLs on a recognized source domain. Order is preserved.
pub fn parse_input_text(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|token| is_accepted(token))
        .map(|token| token.to_string())
        .collect()
}

fn is_accepted(candidate: &str) -> bool {
    let Ok(parsed) = url::Url::parse(candidate) else {
        return false;
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    parsed.host_str().map(is_known_host).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_newlines_and_spaces() {
        let text = "https://youtu.be/a1  https://www.youtube.com/watch?v=b2\r\nhttps://youtu.be/c3";
        let urls = parse_input_text(text);
        assert_eq!(
            urls,
            vec![
                "https://youtu.be/a1",
                "https://www.youtube.com/watch?v=b2",
                "https://youtu.be/c3",
            ]
        );
    }

    #[test]
    fn rejects_other_schemes_and_hosts() {
        let text = "ftp://youtube.com/x https://example.com/watch?v=a not-a-url\nfile:///tmp/x";
        assert!(parse_input_text(text).is_empty());
    }

    #[test]
    fn keeps_music_and_mobile_hosts() {
        let text = "https://music.youtube.com/watch?v=a https://m.youtube.com/watch?v=b";
        assert_eq!(parse_input_text(text).len(), 2);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_input_text("").is_empty());
        assert!(parse_input_text("   \n\n  ").is_empty());
    }
}
