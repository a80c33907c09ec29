use anyhow::{Context, Result};
use std::path::Path;

use crate::export::metadata::TrackMetadata;
use crate::tracks::find_files;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct InsertSummary {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// One threshold per line; blank lines are ignored.
pub fn parse_threshold_file(text: &str) -> Result<Vec<f64>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            line.trim()
                .parse::<f64>()
                .with_context(|| format!("line {}: {:?} is not a number", idx + 1, line))
        })
        .collect()
}

/// Overwrites the `thresholds` of every metadata file under `music_dir` that
/// has a same-named threshold file in `thresholds_dir`.
pub fn insert_thresholds(music_dir: &Path, thresholds_dir: &Path) -> Result<InsertSummary> {
    if !music_dir.is_dir() {
        anyhow::bail!("Music directory {} does not exist", music_dir.display());
    }
    let mut summary = InsertSummary::default();

    for meta_path in find_files(music_dir, &["json".to_string()]) {
        let Some(stem) = meta_path.file_stem() else {
            continue;
        };
        let threshold_path = thresholds_dir.join(stem);
        if !threshold_path.is_file() {
            summary.skipped += 1;
            continue;
        }

        match update_one(&meta_path, &threshold_path) {
            Ok(count) => {
                log::info!("{}: {} thresholds", meta_path.display(), count);
                summary.updated += 1;
            }
            Err(err) => {
                log::error!("{}: {:#}", meta_path.display(), err);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

fn update_one(meta_path: &Path, threshold_path: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(threshold_path)
        .with_context(|| format!("Failed to read {}", threshold_path.display()))?;
    let thresholds = parse_threshold_file(&text)
        .with_context(|| format!("Bad threshold file {}", threshold_path.display()))?;

    let mut meta = TrackMetadata::load(meta_path)?;
    let count = thresholds.len();
    meta.thresholds = Some(thresholds);
    meta.save(meta_path)?;
    Ok(count)
}
