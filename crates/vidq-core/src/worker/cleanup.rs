//! Removal of partial download artifacts after cancellation.

use std::path::{Path, PathBuf};

/// Fragment container extensions the tool leaves behind for unmerged streams.
const FRAGMENT_EXTENSIONS: [&str; 3] = [".mp4", ".webm", ".m4a"];

/// Deletes partial/fragment artifacts left by an interrupted download:
/// files derived from the in-flight output name plus the generic partial-file
/// patterns anywhere in the output directory. Returns the removed paths.
/// Best-effort; individual failures are skipped.
pub fn cleanup_partial_files(download_dir: &Path, in_flight: Option<&str>) -> Vec<PathBuf> {
    let in_flight = in_flight.map(Path::new);
    let base = in_flight
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned());
    let stem = in_flight
        .and_then(|p| p.file_stem())
        .map(|n| n.to_string_lossy().into_owned());

    let mut dirs = vec![download_dir.to_path_buf()];
    if let Some(parent) = in_flight.and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() && parent != download_dir {
            dirs.push(parent.to_path_buf());
        }
    }

    let mut removed = Vec::new();
    for dir in dirs {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_partial_artifact(&name, base.as_deref(), stem.as_deref())
                && std::fs::remove_file(&path).is_ok()
            {
                removed.push(path);
            }
        }
    }
    removed
}

/// Matches the partial-file patterns: generic `*.part`, `*.ytdl`,
/// `*.part-Frag*`, plus `<base>.temp` and `<stem>.f*.<container>` fragment
/// files for the in-flight output name.
fn is_partial_artifact(name: &str, base: Option<&str>, stem: Option<&str>) -> bool {
    if name.ends_with(".part") || name.ends_with(".ytdl") || name.contains(".part-Frag") {
        return true;
    }
    if let Some(base) = base {
        if name == format!("{base}.temp") {
            return true;
        }
    }
    if let Some(stem) = stem {
        if let Some(rest) = name.strip_prefix(stem) {
            if rest.starts_with(".f")
                && FRAGMENT_EXTENSIONS.iter().any(|ext| rest.ends_with(ext))
            {
                return true;
            }
        }
    }
    false
}
