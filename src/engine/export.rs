use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageResult, RgbImage};

use super::format::TargetFormat;

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub jpeg_quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// `<dir>/<stem>.<ext>`, where `dir` defaults to the source's own directory.
pub fn output_path_for(
    source: &Path,
    format: TargetFormat,
    output_dir: Option<&Path>,
) -> Option<PathBuf> {
    let stem = source.file_stem().filter(|s| !s.is_empty())?;
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => source.parent().unwrap_or(Path::new(".")).to_path_buf(),
    };

    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(format.extension());
    Some(dir.join(file_name))
}

/// Encodes `img` into `writer` at the format's default settings.
pub fn export_image<W: Write + Seek>(
    img: &DynamicImage,
    format: TargetFormat,
    options: &ExportOptions,
    mut writer: W,
) -> ImageResult<()> {
    match format {
        TargetFormat::Jpg => {
            let quality = options.jpeg_quality.clamp(1, 100);
            let flattened = DynamicImage::ImageRgb8(flatten_onto_white(img));
            flattened.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        }
        TargetFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut writer,
                CompressionType::Default,
                FilterType::Adaptive,
            );
            widen_float(img).write_with_encoder(encoder)
        }
        TargetFormat::Webp => {
            to_8bit(img).write_with_encoder(WebPEncoder::new_lossless(&mut writer))
        }
        TargetFormat::Bmp => to_8bit(img).write_with_encoder(BmpEncoder::new(&mut writer)),
        TargetFormat::Tiff => {
            for_tiff(img).write_with_encoder(TiffEncoder::new(&mut writer))
        }
    }
}

/// JPEG has no alpha channel, so transparent pixels are composited onto white.
fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let alpha = src[3] as u32;
        for c in 0..3 {
            let blended = (src[c] as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            dst[c] = blended as u8;
        }
    }
    out
}

fn to_8bit(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img.clone(),
        _ if img.color().has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

fn widen_float(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            DynamicImage::ImageRgba16(img.to_rgba16())
        }
        _ => img.clone(),
    }
}

/// The TIFF encoder has no grey+alpha layout; those go out as RGBA at the same depth.
fn for_tiff(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLumaA8(_) => DynamicImage::ImageRgba8(img.to_rgba8()),
        DynamicImage::ImageLumaA16(_) => DynamicImage::ImageRgba16(img.to_rgba16()),
        _ => widen_float(img),
    }
}
