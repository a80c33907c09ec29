use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files under `dir` (recursively) whose extension is in `extensions`, sorted.
/// Symlinks are followed; loops and unreadable entries are logged and skipped.
pub fn find_files(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Skipping {}: {}", dir.display(), err);
                continue;
            }
        };
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    found
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| {
            extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext))
        })
}

/// Expands command-line targets into track files, each queued once. Targets
/// that are neither a file nor a directory are reported and skipped.
pub fn collect_tracks(targets: &[PathBuf], extensions: &[String]) -> Vec<PathBuf> {
    let mut tracks = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = |path: PathBuf| {
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if seen.insert(key) {
            tracks.push(path);
        } else {
            log::debug!("{} already queued", path.display());
        }
    };

    for target in targets {
        if target.is_dir() {
            let found = find_files(target, extensions);
            log::info!("{}: {} track(s)", target.display(), found.len());
            found.into_iter().for_each(&mut queue);
        } else if target.is_file() {
            queue(target.clone());
        } else {
            log::error!(
                "Target {} is not a file or directory! (does file exist?)",
                target.display()
            );
        }
    }
    tracks
}
