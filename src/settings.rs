use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::export::DEFAULT_JPEG_QUALITY;
use crate::engine::runner::MAX_WORKERS;
use crate::engine::{RunnerOptions, TargetFormat};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum ThemePreference {
    System,
    Light,
    Dark,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub target_format: TargetFormat,
    pub output_directory: Option<PathBuf>,
    pub concurrency: usize,
    pub jpeg_quality: u8,
    pub overwrite_existing: bool,
    pub theme_preference: ThemePreference,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            target_format: TargetFormat::Png,
            output_directory: None,
            concurrency: 1,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            overwrite_existing: true,
            theme_preference: ThemePreference::System,
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Reads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<AppSettings>(&contents) {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                warn!("Ignoring corrupt settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        let path = Self::config_path();
        if let Err(e) = self.save_to(&path) {
            warn!("Failed to save settings to {}: {}", path.display(), e);
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("image_batch_converter");
        path.push("settings.json");
        path
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            output_dir: self.output_directory.clone(),
            jpeg_quality: self.jpeg_quality,
            overwrite_existing: self.overwrite_existing,
            ..RunnerOptions::default()
        }
    }

    fn sanitized(mut self) -> Self {
        self.concurrency = self.concurrency.clamp(1, MAX_WORKERS);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = AppSettings {
            target_format: TargetFormat::Webp,
            output_directory: Some(PathBuf::from("/exports")),
            concurrency: 3,
            jpeg_quality: 80,
            overwrite_existing: false,
            theme_preference: ThemePreference::Dark,
        };
        settings.save_to(&path).unwrap();

        assert_eq!(AppSettings::load_from(&path), settings);
    }

    #[test]
    fn test_missing_or_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(AppSettings::load_from(&path), AppSettings::default());

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppSettings::load_from(&path), AppSettings::default());
    }

    #[test]
    fn test_partial_file_is_filled_and_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "target_format": "tiff", "concurrency": 64, "jpeg_quality": 0 }"#)
            .unwrap();

        let settings = AppSettings::load_from(&path);
        assert_eq!(settings.target_format, TargetFormat::Tiff);
        assert_eq!(settings.concurrency, MAX_WORKERS);
        assert_eq!(settings.jpeg_quality, 1);
        assert!(settings.overwrite_existing);
    }

    #[test]
    fn test_runner_options_follow_settings() {
        let settings = AppSettings {
            output_directory: Some(PathBuf::from("/out")),
            jpeg_quality: 70,
            overwrite_existing: false,
            ..Default::default()
        };
        let options = settings.runner_options();
        assert_eq!(options.output_dir, Some(PathBuf::from("/out")));
        assert_eq!(options.jpeg_quality, 70);
        assert!(!options.overwrite_existing);
    }
}
