use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub lights: LightsConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_min_freq")]
    pub min_freq: f64,
    #[serde(default = "default_bucket_count")]
    pub bucket_count: usize,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LightsConfig {
    #[serde(default = "default_hold_off_ms")]
    pub hold_off_ms: f64,
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_freq: default_min_freq(),
            bucket_count: default_bucket_count(),
            extensions: default_extensions(),
        }
    }
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            hold_off_ms: default_hold_off_ms(),
            default_threshold: default_threshold(),
        }
    }
}

fn default_min_freq() -> f64 { crate::spectrum::topology::DEFAULT_MIN_FREQ }
fn default_bucket_count() -> usize { 32 }
fn default_extensions() -> Vec<String> { vec!["mp3".into()] }
fn default_hold_off_ms() -> f64 { 200.0 }
fn default_threshold() -> f64 { 0.8 }

/// Explicit path, then `./spectrolight.toml`, then the per-user config.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("spectrolight.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("spectrolight").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("spectrolight").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}
