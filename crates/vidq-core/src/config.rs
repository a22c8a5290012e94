use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/vidq/config.toml`.
///
/// Every field carries an explicit default so legacy/partial config files
/// keep loading as new fields are added; nothing reads settings ambiently,
/// the manager and the options builder receive this value at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output directory; relative paths resolve against the application root.
    pub download_dir: String,
    /// Output filename template for single-video downloads.
    pub outtmpl_default: String,
    /// Output filename template used when a playlist URL was submitted.
    pub outtmpl_playlist: String,
    /// Target container/codec: mp4, mkv, webm, or audio-only mp3/m4a/opus/flac.
    pub output_format: String,
    /// "best", a height label like "1080p", or "audio_only".
    pub video_quality: String,
    /// "best" or a bitrate label like "192k" (audio-only targets).
    pub audio_quality: String,
    /// User override for the format selector expression; empty = computed.
    pub format_selector: String,
    /// User override for the merge container; empty = derived from output_format.
    pub merge_output_format: String,
    /// Concurrent fragment downloads passed through to the tool.
    pub concurrent_fragments: u32,
    /// Prefer the largest file when formats tie (format-sort directive).
    pub prefer_largest_file: bool,

    pub write_subs: bool,
    pub write_auto_subs: bool,
    /// Comma-separated subtitle language codes.
    pub sub_langs: String,
    pub embed_subs: bool,
    pub write_thumbnail: bool,
    pub embed_thumbnail: bool,
    pub embed_chapters: bool,
    pub add_metadata: bool,

    pub use_cookies_from_browser: bool,
    pub cookies_from_browser: String,
    pub cookies_file: String,

    pub proxy: String,
    /// Retry count forwarded to the tool (its internal per-fragment retries).
    pub retries: u32,
    /// Attempts the worker makes per job (including the first). Min 1.
    pub max_attempts: u32,
    /// Declared but not enforced: workers are currently unbounded.
    pub concurrent_downloads: u32,

    /// Comma-separated alternate player client identifiers.
    pub yt_player_clients: String,
    /// Preferred metadata language.
    pub yt_lang: String,
    /// Proof-of-origin access token.
    pub yt_po_token: String,
    /// Skip age-restricted content via a match filter.
    pub yt_skip_age_restricted: bool,

    pub sponsorblock_enable: bool,
    /// Comma-separated categories whose segments are cut from the output.
    pub sponsorblock_remove: String,
    /// Comma-separated categories marked as chapters only.
    pub sponsorblock_mark: String,
    pub sponsorblock_api_url: String,

    /// Display sort: newest first when true.
    pub list_sort_desc: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_dir: "ytdl".to_string(),
            outtmpl_default: "[%(uploader)s] %(title)s (%(id)s).%(ext)s".to_string(),
            outtmpl_playlist:
                "[Playlist] %(playlist_title)s/%(playlist_index)03d. %(title)s (%(id)s).%(ext)s"
                    .to_string(),
            output_format: "mp4".to_string(),
            video_quality: "best".to_string(),
            audio_quality: "best".to_string(),
            format_selector: String::new(),
            merge_output_format: String::new(),
            concurrent_fragments: 4,
            prefer_largest_file: false,
            write_subs: false,
            write_auto_subs: false,
            sub_langs: "ko,en".to_string(),
            embed_subs: false,
            write_thumbnail: false,
            embed_thumbnail: true,
            embed_chapters: true,
            add_metadata: true,
            use_cookies_from_browser: false,
            cookies_from_browser: "chrome".to_string(),
            cookies_file: String::new(),
            proxy: String::new(),
            retries: 10,
            max_attempts: 1,
            concurrent_downloads: 3,
            yt_player_clients: String::new(),
            yt_lang: "ko".to_string(),
            yt_po_token: String::new(),
            yt_skip_age_restricted: false,
            sponsorblock_enable: false,
            sponsorblock_remove: "sponsor,intro,outro".to_string(),
            sponsorblock_mark: String::new(),
            sponsorblock_api_url: String::new(),
            list_sort_desc: false,
        }
    }
}

impl AppConfig {
    /// Worker attempt count, clamped to at least one.
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vidq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AppConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = AppConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: AppConfig = toml::from_str(&data)?;
    Ok(cfg)
}
