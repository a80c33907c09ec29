use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use super::series::parent_dir;
use crate::audio::tags::TrackTags;
use crate::spectrum::pipeline::TrackCalibration;

/// Per-track JSON record consumed by the light player.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    #[serde(flatten)]
    pub tags: TrackTags,
    #[serde(rename = "msPerLine", default, skip_serializing_if = "Option::is_none")]
    pub ms_per_line: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Vec<f64>>,
}

impl TrackMetadata {
    pub fn from_tags(tags: TrackTags) -> Self {
        Self {
            tags,
            ..Default::default()
        }
    }

    pub fn with_calibration(mut self, calibration: &TrackCalibration) -> Self {
        self.ms_per_line = Some(calibration.ms_per_line);
        self.thresholds = Some(calibration.thresholds.clone());
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse metadata: {}", path.display()))
    }

    /// Serializes to a temp file next to `path`, then renames over it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = parent_dir(path);
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        serde_json::to_writer(&mut tmp, self)
            .with_context(|| format!("Failed to serialize metadata for {}", path.display()))?;
        tmp.flush()?;
        tmp.persist(path)
            .with_context(|| format!("Failed to write metadata: {}", path.display()))?;
        Ok(())
    }
}
