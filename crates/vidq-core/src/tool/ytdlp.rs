//! Subprocess adapter driving the `yt-dlp` executable.
//!
//! Maps `ToolOptions` to argv, parses `--newline` progress output into
//! `RawProgress`, and checks the cancel flag once per output line, killing
//! the child on abort.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::control::CancelToken;
use crate::options::{Postprocessor, ToolOptions};
use crate::progress::RawProgress;

use super::{MediaInfo, MediaTool, ToolError};

static PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("percent pattern"));
static SPEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"at\s+(\S+)").expect("speed pattern"));
static ETA: Lazy<Regex> = Lazy::new(|| Regex::new(r"ETA\s+(\S+)").expect("eta pattern"));

/// `MediaTool` backed by a `yt-dlp` binary on PATH (or an explicit path).
#[derive(Debug, Clone)]
pub struct YtDlpTool {
    program: PathBuf,
}

impl Default for YtDlpTool {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
        }
    }
}

impl YtDlpTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MediaTool for YtDlpTool {
    fn probe(
        &self,
        opts: &ToolOptions,
        url: &str,
        cancel: &CancelToken,
    ) -> Result<MediaInfo, ToolError> {
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        let mut args = vec![
            "-J".to_string(),
            "--simulate".to_string(),
            "--no-warnings".to_string(),
        ];
        args.extend(common_args(opts));
        args.push(url.to_string());

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ToolError::Failed(format!("failed to run {:?}: {}", self.program, e)))?;
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        if !output.status.success() {
            return Err(ToolError::Failed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| ToolError::Failed(format!("unparsable probe output: {e}")))
    }

    fn download(
        &self,
        opts: &ToolOptions,
        urls: &[String],
        on_progress: &mut dyn FnMut(RawProgress),
        cancel: &CancelToken,
    ) -> Result<(), ToolError> {
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        let mut args = vec!["--newline".to_string(), "--progress".to_string()];
        args.extend(download_args(opts));
        args.extend(urls.iter().cloned());

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolError::Failed(format!("failed to run {:?}: {}", self.program, e)))?;

        // Drain stderr on a side thread so neither pipe can fill up and stall
        // the child while we read stdout.
        let stderr_handle = child.stderr.take().map(|mut err| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = err.read_to_string(&mut buf);
                buf
            })
        });

        let stdout = child.stdout.take();
        let mut current_filename: Option<String> = None;
        if let Some(out) = stdout {
            for line in BufReader::new(out).lines() {
                let Ok(line) = line else { break };
                if cancel.is_cancelled() {
                    kill_and_reap(&mut child);
                    return Err(ToolError::Cancelled);
                }
                if let Some(raw) = parse_progress_line(&line, &mut current_filename) {
                    on_progress(raw);
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| ToolError::Failed(format!("wait for {:?}: {}", self.program, e)))?;
        let stderr_text = stderr_handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed(stderr_text))
        }
    }
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Parses one `--newline` output line. Destination lines update the in-flight
/// filename carried on subsequent progress events.
fn parse_progress_line(line: &str, current_filename: &mut Option<String>) -> Option<RawProgress> {
    if let Some(dest) = line.strip_prefix("[download] Destination: ") {
        *current_filename = Some(dest.trim().to_string());
        return None;
    }
    if !line.starts_with("[download]") {
        return None;
    }
    let percent = PERCENT.captures(line)?.get(1)?.as_str().to_string();
    Some(RawProgress {
        status: "downloading".to_string(),
        filename: current_filename.clone(),
        percent_str: Some(format!("{percent}%")),
        eta_str: ETA
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
        speed_str: SPEED
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
        ..Default::default()
    })
}

/// Arguments shared by probe and download: auth, network, extractor params.
fn common_args(opts: &ToolOptions) -> Vec<String> {
    let mut args = Vec::new();

    if opts.allow_playlist {
        args.push("--yes-playlist".to_string());
    } else {
        args.push("--no-playlist".to_string());
    }
    if let Some(browser) = &opts.cookies_from_browser {
        args.push("--cookies-from-browser".to_string());
        args.push(browser.clone());
    }
    if let Some(file) = &opts.cookie_file {
        args.push("--cookies".to_string());
        args.push(file.display().to_string());
    }
    if let Some(proxy) = &opts.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }
    args.push("--retries".to_string());
    args.push(opts.retries.to_string());

    let mut extractor = Vec::new();
    if let Some(lang) = &opts.extractor_lang {
        extractor.push(format!("lang={lang}"));
    }
    if !opts.player_clients.is_empty() {
        extractor.push(format!("player_client={}", opts.player_clients.join(",")));
    }
    if let Some(token) = &opts.po_token {
        extractor.push(format!("po_token={token}"));
    }
    if !extractor.is_empty() {
        args.push("--extractor-args".to_string());
        args.push(format!("youtube:{}", extractor.join(";")));
    }
    if let Some(filter) = &opts.match_filter {
        args.push("--match-filter".to_string());
        args.push(filter.clone());
    }

    args
}

/// Full download argv (excluding URLs).
fn download_args(opts: &ToolOptions) -> Vec<String> {
    let mut args = common_args(opts);

    args.push("-P".to_string());
    args.push(opts.download_dir.display().to_string());
    args.push("-o".to_string());
    args.push(opts.output_template.clone());
    if let Some(format) = &opts.format {
        args.push("-f".to_string());
        args.push(format.clone());
    }
    if let Some(merge) = &opts.merge_output_format {
        args.push("--merge-output-format".to_string());
        args.push(merge.clone());
    }
    args.push("--concurrent-fragments".to_string());
    args.push(opts.concurrent_fragments.to_string());

    if opts.write_subs {
        args.push("--write-subs".to_string());
    }
    if opts.write_auto_subs {
        args.push("--write-auto-subs".to_string());
    }
    if !opts.subtitle_langs.is_empty() {
        args.push("--sub-langs".to_string());
        args.push(opts.subtitle_langs.join(","));
    }
    if opts.write_thumbnail {
        args.push("--write-thumbnail".to_string());
    }
    if !opts.format_sort.is_empty() {
        args.push("-S".to_string());
        args.push(opts.format_sort.join(","));
        if opts.format_sort_force {
            args.push("--format-sort-force".to_string());
        }
    }

    // The pipeline's segment-lookup stage covers both marked and removed
    // categories; on the command line the two are disjoint sets, so removed
    // categories must not also reach `--sponsorblock-mark`.
    let removed: std::collections::HashSet<&str> = opts
        .postprocessors
        .iter()
        .filter_map(|pp| match pp {
            Postprocessor::ModifyChapters { remove_categories } => Some(remove_categories),
            _ => None,
        })
        .flatten()
        .map(String::as_str)
        .collect();

    for pp in &opts.postprocessors {
        match pp {
            Postprocessor::ExtractAudio { codec, quality } => {
                args.push("-x".to_string());
                args.push("--audio-format".to_string());
                args.push(codec.clone());
                if let Some(q) = quality {
                    args.push("--audio-quality".to_string());
                    args.push(format!("{q}K"));
                }
            }
            Postprocessor::EmbedSubtitle => args.push("--embed-subs".to_string()),
            Postprocessor::EmbedThumbnail => args.push("--embed-thumbnail".to_string()),
            Postprocessor::Metadata { chapters, tags } => {
                if *tags {
                    args.push("--embed-metadata".to_string());
                }
                if *chapters {
                    args.push("--embed-chapters".to_string());
                }
            }
            Postprocessor::SponsorBlock {
                categories,
                api_url,
            } => {
                let mark: Vec<&str> = categories
                    .iter()
                    .map(String::as_str)
                    .filter(|c| !removed.contains(c))
                    .collect();
                if !mark.is_empty() {
                    args.push("--sponsorblock-mark".to_string());
                    args.push(mark.join(","));
                }
                if let Some(api) = api_url {
                    args.push("--sponsorblock-api".to_string());
                    args.push(api.clone());
                }
            }
            Postprocessor::ModifyChapters { remove_categories } => {
                args.push("--sponsorblock-remove".to_string());
                args.push(remove_categories.join(","));
            }
        }
    }

    args
}
