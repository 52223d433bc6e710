//! Expands a user selection of files and folders into the images to convert,
//! and loads thumbnails of them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::debug;
use walkdir::WalkDir;

use super::error::ConversionError;

/// Extensions accepted as conversion sources.
pub const INPUT_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "bmp", "tif", "tiff", "gif", "ico",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub accepted: Vec<PathBuf>,
    pub skipped: usize,
}

pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| INPUT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Walks folders recursively, keeps files with an image extension whose
/// header can be read, and drops duplicates while preserving order.
pub fn collect_images<I, P>(paths: I) -> ScanReport
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut report = ScanReport::default();
    let mut seen = HashSet::new();

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() {
                    consider(entry.path(), &mut seen, &mut report);
                }
            }
        } else {
            consider(path, &mut seen, &mut report);
        }
    }

    debug!(
        "Scan accepted {} image(s), skipped {}",
        report.accepted.len(),
        report.skipped
    );
    report
}

fn consider(path: &Path, seen: &mut HashSet<PathBuf>, report: &mut ScanReport) {
    if !path.is_file() || !is_supported_input(path) {
        report.skipped += 1;
        return;
    }

    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if seen.contains(&resolved) {
        return;
    }

    if !is_readable_image(&resolved) {
        debug!("Skipping unreadable image {}", resolved.display());
        report.skipped += 1;
        return;
    }

    seen.insert(resolved.clone());
    report.accepted.push(resolved);
}

fn is_readable_image(path: &Path) -> bool {
    image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map(|reader| reader.into_dimensions().is_ok())
        .unwrap_or(false)
}

/// Decodes `path` and shrinks it to fit a `max_side` square. Smaller images
/// are returned at their own size.
pub fn load_thumbnail(path: &Path, max_side: u32) -> Result<RgbaImage, ConversionError> {
    let img = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| ConversionError::unreadable(path, e))?
        .decode()
        .map_err(|e| ConversionError::unreadable(path, e))?;

    if img.width() <= max_side && img.height() <= max_side {
        return Ok(img.to_rgba8());
    }
    Ok(img.thumbnail(max_side, max_side).to_rgba8())
}
