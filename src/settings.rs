//! Engine settings, persisted as JSON.
//!
//! A single explicit configuration struct is handed to the session at
//! construction. Missing fields fall back to defaults so older settings
//! files keep loading.

use crate::constants::{
    DEFAULT_EDGE_INSET_DP, DEFAULT_MAX_SCALE, DEFAULT_OVERZOOM_FACTOR, DEFAULT_SCROLL_MIN_POINTERS,
    DEFAULT_WORKER_THREADS,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tunable engine settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Screen pixels per density-independent unit
    pub density: f32,
    /// Upper zoom bound
    pub max_scale: f32,
    /// How far a live pinch may overshoot `max_scale`
    pub overzoom_factor: f32,
    /// Margin the image may shrink away from the view edges (dp)
    pub edge_inset_dp: f32,
    pub double_tap_zoom: bool,
    /// Pointers required before scroll/fling pan the image
    pub scroll_min_pointers: usize,
    /// Freehand brush size; stroke width is ten dp per unit
    pub brush_size: f32,
    /// Background threads for oracle and codec work
    pub worker_threads: usize,
    /// Scale loaded images down to the view size
    pub fit_loaded_images: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            density: 1.0,
            max_scale: DEFAULT_MAX_SCALE,
            overzoom_factor: DEFAULT_OVERZOOM_FACTOR,
            edge_inset_dp: DEFAULT_EDGE_INSET_DP,
            double_tap_zoom: true,
            scroll_min_pointers: DEFAULT_SCROLL_MIN_POINTERS,
            brush_size: 1.0,
            worker_threads: DEFAULT_WORKER_THREADS,
            fit_loaded_images: true,
        }
    }
}

impl Settings {
    /// Convert density-independent units to pixels
    #[inline]
    pub fn dp(&self, value: f32) -> f32 {
        value * self.density
    }

    /// `<config dir>/recolor/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("recolor").join("settings.json"))
    }

    /// Load settings from `path`, returning defaults when the file doesn't exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        Ok(settings.sanitized())
    }

    /// Write settings as pretty JSON, replacing the file atomically
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let dir = path
            .parent()
            .context("Settings path has no parent directory")?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let json = serde_json::to_string_pretty(self)?;
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(json.as_bytes())?;
        file.persist(path)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Clamp values that would break the engine back into range
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.density > 0.0) {
            self.density = defaults.density;
        }
        if !(self.max_scale > 0.0) {
            self.max_scale = defaults.max_scale;
        }
        if !(self.overzoom_factor >= 1.0) {
            self.overzoom_factor = defaults.overzoom_factor;
        }
        if !(self.brush_size > 0.0) {
            self.brush_size = defaults.brush_size;
        }
        self.scroll_min_pointers = self.scroll_min_pointers.max(1);
        self.worker_threads = self.worker_threads.max(1);
        self
    }
}
