//! Options Builder: (job request, global configuration) → external-tool options.
//!
//! Pure and infallible: every missing or invalid configuration field resolves
//! to a sane default, and every option whose value is empty stays `None`/empty
//! so the tool adapter only forwards meaningfully-set fields.

mod format;
mod postprocess;

pub use format::{build_format_selector, fallback_format_selector, is_audio_format};
pub use postprocess::Postprocessor;

use crate::config::AppConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options value handed to the external extraction/conversion tool.
///
/// `None` and empty-`Vec` fields mean "not set" and are omitted by adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOptions {
    pub allow_playlist: bool,
    /// Absolute output directory.
    pub download_dir: PathBuf,
    pub output_template: String,
    pub format: Option<String>,
    pub merge_output_format: Option<String>,
    pub concurrent_fragments: u32,
    pub write_subs: bool,
    pub write_auto_subs: bool,
    pub subtitle_langs: Vec<String>,
    pub write_thumbnail: bool,
    pub cookies_from_browser: Option<String>,
    pub cookie_file: Option<PathBuf>,
    pub proxy: Option<String>,
    pub retries: u32,
    pub extractor_lang: Option<String>,
    pub player_clients: Vec<String>,
    pub po_token: Option<String>,
    pub match_filter: Option<String>,
    pub format_sort: Vec<String>,
    pub format_sort_force: bool,
    pub postprocessors: Vec<Postprocessor>,
}

impl ToolOptions {
    /// Builds the full options value for one job.
    ///
    /// Relative output directories resolve against `app_root` (the fixed
    /// application root); the playlist output template is chosen iff the job
    /// was submitted with a playlist URL.
    pub fn build(cfg: &AppConfig, allow_playlist: bool, app_root: &Path) -> Self {
        let download_dir = resolve_download_dir(&cfg.download_dir, app_root);
        let output_template = if allow_playlist {
            cfg.outtmpl_playlist.clone()
        } else {
            cfg.outtmpl_default.clone()
        };

        let format = non_empty(&cfg.format_selector)
            .unwrap_or_else(|| build_format_selector(&cfg.output_format, &cfg.video_quality));

        let merge_output_format = non_empty(&cfg.merge_output_format).or_else(|| {
            matches!(cfg.output_format.as_str(), "mp4" | "mkv" | "webm")
                .then(|| cfg.output_format.clone())
        });

        let cookies_from_browser = cfg
            .use_cookies_from_browser
            .then(|| non_empty(&cfg.cookies_from_browser))
            .flatten();

        let (format_sort, format_sort_force) = if cfg.prefer_largest_file {
            (
                vec![
                    "filesize:best".to_string(),
                    "res:best".to_string(),
                    "fps:best".to_string(),
                    "br:best".to_string(),
                ],
                true,
            )
        } else {
            (Vec::new(), false)
        };

        Self {
            allow_playlist,
            download_dir,
            output_template,
            format: Some(format),
            merge_output_format,
            concurrent_fragments: cfg.concurrent_fragments,
            write_subs: cfg.write_subs,
            write_auto_subs: cfg.write_auto_subs,
            subtitle_langs: split_csv(&cfg.sub_langs),
            write_thumbnail: cfg.write_thumbnail || cfg.embed_thumbnail,
            cookies_from_browser,
            cookie_file: non_empty(&cfg.cookies_file).map(PathBuf::from),
            proxy: non_empty(&cfg.proxy),
            retries: cfg.retries,
            extractor_lang: non_empty(&cfg.yt_lang),
            player_clients: split_csv(&cfg.yt_player_clients),
            po_token: non_empty(&cfg.yt_po_token),
            match_filter: cfg
                .yt_skip_age_restricted
                .then(|| "age_limit is None or age_limit < 18".to_string()),
            format_sort,
            format_sort_force,
            postprocessors: build_pipeline(cfg),
        }
    }

    /// One-time rewrite after a format-unavailable failure: minimal "best"
    /// selector, no merge directive, no format sort, no client override.
    pub fn apply_format_fallback(&mut self, output_format: &str) {
        self.format = Some(fallback_format_selector(output_format));
        self.merge_output_format = None;
        self.format_sort.clear();
        self.format_sort_force = false;
        self.player_clients.clear();
    }
}

/// Assembles the postprocessing pipeline in its fixed order:
/// audio extraction first (when the target is audio-only), then subtitle and
/// thumbnail embedding, metadata/chapter tagging, and finally the content-skip
/// stages (segment lookup, then chapter modification) when enabled.
fn build_pipeline(cfg: &AppConfig) -> Vec<Postprocessor> {
    let mut pipeline = Vec::new();

    if cfg.embed_subs {
        pipeline.push(Postprocessor::EmbedSubtitle);
    }
    if cfg.embed_thumbnail {
        pipeline.push(Postprocessor::EmbedThumbnail);
    }
    if cfg.add_metadata {
        pipeline.push(Postprocessor::Metadata {
            chapters: cfg.embed_chapters,
            tags: true,
        });
    } else if cfg.embed_chapters {
        pipeline.push(Postprocessor::Metadata {
            chapters: true,
            tags: false,
        });
    }

    if is_audio_format(&cfg.output_format) {
        let quality = audio_bitrate(&cfg.audio_quality);
        pipeline.insert(
            0,
            Postprocessor::ExtractAudio {
                codec: cfg.output_format.clone(),
                quality,
            },
        );
    }

    if cfg.sponsorblock_enable {
        let remove = split_csv(&cfg.sponsorblock_remove);
        let mark = split_csv(&cfg.sponsorblock_mark);
        let mut categories = remove.clone();
        categories.extend(mark);
        if !categories.is_empty() {
            pipeline.push(Postprocessor::SponsorBlock {
                categories,
                api_url: non_empty(&cfg.sponsorblock_api_url),
            });
            if !remove.is_empty() {
                pipeline.push(Postprocessor::ModifyChapters {
                    remove_categories: remove,
                });
            }
        }
    }

    pipeline
}

fn resolve_download_dir(dir: &str, app_root: &Path) -> PathBuf {
    let dir = if dir.is_empty() { "ytdl" } else { dir };
    let path = Path::new(dir);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        app_root.join(path)
    }
}

/// `"192k"` → `"192"`; non-numeric labels like "best" are dropped.
fn audio_bitrate(audio_quality: &str) -> Option<String> {
    let digits = audio_quality.trim().trim_end_matches('k');
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits.to_string())
    } else {
        None
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn cfg() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn relative_dir_resolves_against_app_root() {
        let opts = ToolOptions::build(&cfg(), false, Path::new("/opt/vidq"));
        assert_eq!(opts.download_dir, PathBuf::from("/opt/vidq/ytdl"));

        let mut c = cfg();
        c.download_dir = "/abs/media".to_string();
        let opts = ToolOptions::build(&c, false, Path::new("/opt/vidq"));
        assert_eq!(opts.download_dir, PathBuf::from("/abs/media"));
    }

    #[test]
    fn template_follows_playlist_flag() {
        let c = cfg();
        let single = ToolOptions::build(&c, false, Path::new("/r"));
        let playlist = ToolOptions::build(&c, true, Path::new("/r"));
        assert_eq!(single.output_template, c.outtmpl_default);
        assert_eq!(playlist.output_template, c.outtmpl_playlist);
        assert!(!single.allow_playlist);
        assert!(playlist.allow_playlist);
    }

    #[test]
    fn explicit_selector_override_wins() {
        let mut c = cfg();
        c.format_selector = "bv*+ba".to_string();
        let opts = ToolOptions::build(&c, false, Path::new("/r"));
        assert_eq!(opts.format.as_deref(), Some("bv*+ba"));
    }

    #[test]
    fn merge_container_derived_for_video_targets_only() {
        let mut c = cfg();
        c.output_format = "mkv".to_string();
        assert_eq!(
            ToolOptions::build(&c, false, Path::new("/r"))
                .merge_output_format
                .as_deref(),
            Some("mkv")
        );

        c.output_format = "mp3".to_string();
        assert_eq!(
            ToolOptions::build(&c, false, Path::new("/r")).merge_output_format,
            None
        );
    }

    #[test]
    fn audio_target_prepends_extract_audio() {
        let mut c = cfg();
        c.output_format = "mp3".to_string();
        c.audio_quality = "192k".to_string();
        c.embed_subs = true;
        let opts = ToolOptions::build(&c, false, Path::new("/r"));
        assert_eq!(
            opts.postprocessors[0],
            Postprocessor::ExtractAudio {
                codec: "mp3".to_string(),
                quality: Some("192".to_string()),
            }
        );
        assert!(opts
            .postprocessors
            .contains(&Postprocessor::EmbedSubtitle));
    }

    #[test]
    fn non_numeric_audio_quality_dropped() {
        let mut c = cfg();
        c.output_format = "opus".to_string();
        c.audio_quality = "best".to_string();
        let opts = ToolOptions::build(&c, false, Path::new("/r"));
        assert_eq!(
            opts.postprocessors[0],
            Postprocessor::ExtractAudio {
                codec: "opus".to_string(),
                quality: None,
            }
        );
    }

    #[test]
    fn sponsorblock_stages_share_remove_categories() {
        let mut c = cfg();
        c.sponsorblock_enable = true;
        c.sponsorblock_remove = "sponsor,intro".to_string();
        c.sponsorblock_mark = "outro".to_string();
        let opts = ToolOptions::build(&c, false, Path::new("/r"));
        let n = opts.postprocessors.len();
        assert_eq!(
            opts.postprocessors[n - 2],
            Postprocessor::SponsorBlock {
                categories: vec![
                    "sponsor".to_string(),
                    "intro".to_string(),
                    "outro".to_string()
                ],
                api_url: None,
            }
        );
        assert_eq!(
            opts.postprocessors[n - 1],
            Postprocessor::ModifyChapters {
                remove_categories: vec!["sponsor".to_string(), "intro".to_string()],
            }
        );
    }

    #[test]
    fn sponsorblock_mark_only_skips_modify_stage() {
        let mut c = cfg();
        c.sponsorblock_enable = true;
        c.sponsorblock_remove = String::new();
        c.sponsorblock_mark = "sponsor".to_string();
        let opts = ToolOptions::build(&c, false, Path::new("/r"));
        assert!(matches!(
            opts.postprocessors.last(),
            Some(Postprocessor::SponsorBlock { .. })
        ));
    }

    #[test]
    fn empty_fields_stay_unset() {
        let opts = ToolOptions::build(&cfg(), false, Path::new("/r"));
        assert_eq!(opts.proxy, None);
        assert_eq!(opts.po_token, None);
        assert_eq!(opts.cookie_file, None);
        // Cookies-from-browser requires the opt-in flag, not just a browser name.
        assert_eq!(opts.cookies_from_browser, None);
        assert!(opts.player_clients.is_empty());
        assert!(opts.format_sort.is_empty());
    }

    #[test]
    fn fallback_rewrite_strips_directives() {
        let mut c = cfg();
        c.prefer_largest_file = true;
        c.yt_player_clients = "web,android".to_string();
        let mut opts = ToolOptions::build(&c, false, Path::new("/r"));
        assert!(!opts.format_sort.is_empty());
        assert!(!opts.player_clients.is_empty());

        opts.apply_format_fallback(&c.output_format);
        assert_eq!(opts.format.as_deref(), Some("best"));
        assert_eq!(opts.merge_output_format, None);
        assert!(opts.format_sort.is_empty());
        assert!(!opts.format_sort_force);
        assert!(opts.player_clients.is_empty());
    }
}
