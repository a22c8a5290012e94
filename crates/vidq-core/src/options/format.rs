//! Format selector expressions.

/// Output formats that imply an audio-only download.
pub const AUDIO_FORMATS: [&str; 4] = ["mp3", "m4a", "opus", "flac"];

pub fn is_audio_format(output_format: &str) -> bool {
    AUDIO_FORMATS.contains(&output_format)
}

/// Computes the format selector for the target format and quality label.
///
/// Audio-only targets (or an explicit "audio_only" quality) request the best
/// audio stream. Video targets request a best video+audio pair, preferring
/// streams already in the target container, with an optional height ceiling
/// parsed from labels like "1080p" and layered fallbacks down to `best`.
pub fn build_format_selector(output_format: &str, video_quality: &str) -> String {
    if is_audio_format(output_format) || video_quality == "audio_only" {
        return "bestaudio/best".to_string();
    }

    let limit = height_limit(video_quality);
    best_combo(output_format, &limit)
}

/// Minimal selector used by the one-time fallback rewrite after a
/// format-unavailable failure.
pub fn fallback_format_selector(output_format: &str) -> String {
    if is_audio_format(output_format) {
        "bestaudio/best".to_string()
    } else {
        "best".to_string()
    }
}

fn best_combo(output_format: &str, limit: &str) -> String {
    match output_format {
        "mp4" => format!(
            "bestvideo[ext=mp4]{limit}+bestaudio[ext=m4a]/bestvideo{limit}+bestaudio/best{limit}/best"
        ),
        "webm" => format!(
            "bestvideo[ext=webm]{limit}+bestaudio[ext=webm]/bestvideo{limit}+bestaudio/best{limit}/best"
        ),
        _ => format!("bestvideo{limit}+bestaudio/best{limit}/best"),
    }
}

/// `"1080p"` → `"[height<=1080]"`; anything else (including "best") → no limit.
fn height_limit(video_quality: &str) -> String {
    let Some(h) = video_quality.strip_suffix('p') else {
        return String::new();
    };
    match h.parse::<u32>() {
        Ok(height) if height > 0 => format!("[height<={height}]"),
        _ => String::new(),
    }
}
