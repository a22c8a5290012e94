//! Progress normalization: raw tool progress → (status, percent, eta, speed).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ANSI_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("ansi pattern"));

/// Raw progress event as emitted by the external tool's hook.
///
/// Byte counts are preferred for the percent computation; the pre-formatted
/// strings are a fallback because some extractors only supply those.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProgress {
    pub status: String,
    pub filename: Option<String>,
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub total_bytes_estimate: Option<u64>,
    pub percent_str: Option<String>,
    pub eta_str: Option<String>,
    pub speed_str: Option<String>,
}

/// Normalized progress snapshot for the manager/UI.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub status: String,
    /// 0.0..=100.0; defaults to 0.0 whenever nothing parseable was supplied.
    pub percent: f64,
    pub eta: String,
    pub speed: String,
}

impl ProgressUpdate {
    /// Translates a raw event. Never fails: any unparsable field yields its
    /// zero/default value only, leaving the rest intact.
    pub fn from_raw(raw: &RawProgress) -> Self {
        let total = raw.total_bytes.or(raw.total_bytes_estimate);
        let percent = match (raw.downloaded_bytes, total) {
            (Some(done), Some(total)) if total > 0 => (done as f64 / total as f64) * 100.0,
            _ => raw
                .percent_str
                .as_deref()
                .map(parse_percent_str)
                .unwrap_or(0.0),
        };

        Self {
            status: strip_ansi(&raw.status),
            percent,
            eta: strip_ansi(raw.eta_str.as_deref().unwrap_or("")),
            speed: strip_ansi(raw.speed_str.as_deref().unwrap_or("")),
        }
    }

    /// One-line display summary, e.g. `downloading  ·  43.2%  ·  ETA 00:12  ·  @ 3.4MiB/s`.
    pub fn status_line(&self) -> String {
        let mut parts = Vec::new();
        if !self.status.is_empty() {
            parts.push(self.status.clone());
        }
        parts.push(format!("{:.1}%", self.percent));
        if !self.eta.is_empty() {
            parts.push(format!("ETA {}", self.eta));
        }
        if !self.speed.is_empty() {
            parts.push(format!("@ {}", self.speed));
        }
        parts.join("  ·  ").trim().to_string()
    }
}

/// Removes terminal color-escape sequences.
pub fn strip_ansi(text: &str) -> String {
    ANSI_COLOR.replace_all(text, "").into_owned()
}

fn parse_percent_str(text: &str) -> f64 {
    strip_ansi(text)
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_from_byte_counts() {
        let raw = RawProgress {
            status: "downloading".to_string(),
            downloaded_bytes: Some(25),
            total_bytes: Some(200),
            percent_str: Some("99.9%".to_string()),
            ..Default::default()
        };
        let update = ProgressUpdate::from_raw(&raw);
        assert!((update.percent - 12.5).abs() < 1e-9);
    }

    #[test]
    fn estimate_used_when_total_missing() {
        let raw = RawProgress {
            downloaded_bytes: Some(50),
            total_bytes_estimate: Some(100),
            ..Default::default()
        };
        assert!((ProgressUpdate::from_raw(&raw).percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn percent_string_fallback() {
        let raw = RawProgress {
            percent_str: Some(" 43.5% ".to_string()),
            ..Default::default()
        };
        assert!((ProgressUpdate::from_raw(&raw).percent - 43.5).abs() < 1e-9);
    }

    #[test]
    fn unparsable_percent_defaults_to_zero() {
        let raw = RawProgress {
            status: "downloading".to_string(),
            percent_str: Some("N/A".to_string()),
            ..Default::default()
        };
        let update = ProgressUpdate::from_raw(&raw);
        assert_eq!(update.percent, 0.0);
        assert_eq!(update.status, "downloading");
    }

    #[test]
    fn strips_color_escapes_from_all_text_fields() {
        let raw = RawProgress {
            status: "\x1b[32mdownloading\x1b[0m".to_string(),
            percent_str: Some("\x1b[1m12.0%\x1b[0m".to_string()),
            eta_str: Some("\x1b[33m00:42\x1b[0m".to_string()),
            speed_str: Some("\x1b[36m1.2MiB/s\x1b[0m".to_string()),
            ..Default::default()
        };
        let update = ProgressUpdate::from_raw(&raw);
        assert_eq!(update.status, "downloading");
        assert!((update.percent - 12.0).abs() < 1e-9);
        assert_eq!(update.eta, "00:42");
        assert_eq!(update.speed, "1.2MiB/s");
    }

    #[test]
    fn status_line_joins_present_parts() {
        let update = ProgressUpdate {
            status: "downloading".to_string(),
            percent: 43.25,
            eta: "00:12".to_string(),
            speed: "3.4MiB/s".to_string(),
        };
        assert_eq!(
            update.status_line(),
            "downloading  ·  43.2%  ·  ETA 00:12  ·  @ 3.4MiB/s"
        );

        let bare = ProgressUpdate {
            status: String::new(),
            percent: 0.0,
            eta: String::new(),
            speed: String::new(),
        };
        assert_eq!(bare.status_line(), "0.0%");
    }
}
