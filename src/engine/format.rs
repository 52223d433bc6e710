use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ConversionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Jpg,
    Png,
    Webp,
    Bmp,
    Tiff,
}

impl TargetFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Jpg => "JPG",
            TargetFormat::Png => "PNG",
            TargetFormat::Webp => "WebP",
            TargetFormat::Bmp => "BMP",
            TargetFormat::Tiff => "TIFF",
        }
    }

    /// Canonical extension written on output files.
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Jpg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::Webp => "webp",
            TargetFormat::Bmp => "bmp",
            TargetFormat::Tiff => "tiff",
        }
    }

    pub fn all() -> &'static [TargetFormat] {
        &[
            TargetFormat::Jpg,
            TargetFormat::Png,
            TargetFormat::Webp,
            TargetFormat::Bmp,
            TargetFormat::Tiff,
        ]
    }

    /// Maps a file extension (any case, with or without the dot) onto a target format.
    pub fn from_extension(ext: &str) -> Option<TargetFormat> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(TargetFormat::Jpg),
            "png" => Some(TargetFormat::Png),
            "webp" => Some(TargetFormat::Webp),
            "bmp" => Some(TargetFormat::Bmp),
            "tif" | "tiff" => Some(TargetFormat::Tiff),
            _ => None,
        }
    }

    /// Format implied by the extension of `path`, if it is one of ours.
    pub fn of_path(path: &Path) -> Option<TargetFormat> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(TargetFormat::from_extension)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetFormat::from_extension(s.trim())
            .ok_or_else(|| ConversionError::InvalidFormat(s.to_string()))
    }
}
