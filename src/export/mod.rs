pub mod metadata;
pub mod series;

use std::path::{Path, PathBuf};

/// Time-series file for an audio track.
pub fn series_path(track: &Path) -> PathBuf {
    track.with_extension("csv")
}

/// Metadata file for an audio track.
pub fn metadata_path(track: &Path) -> PathBuf {
    track.with_extension("json")
}
