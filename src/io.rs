use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{DynamicImage, ImageError, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::canvas::{BoundedImage, IntRect};

/// Maximum supported image dimension in pixels (per axis).
pub const MAX_CANVAS_DIM: u32 = 32_768;

/// Errors from reading or writing raster files.
#[derive(Debug)]
pub enum ImageIoError {
    Io(std::io::Error),
    Image(ImageError),
    InvalidFormat(String),
}

impl std::fmt::Display for ImageIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageIoError::Io(e) => write!(f, "I/O error: {}", e),
            ImageIoError::Image(e) => write!(f, "Image error: {}", e),
            ImageIoError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
        }
    }
}

impl std::error::Error for ImageIoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageIoError::Io(e) => Some(e),
            ImageIoError::Image(e) => Some(e),
            ImageIoError::InvalidFormat(_) => None,
        }
    }
}

impl From<std::io::Error> for ImageIoError {
    fn from(e: std::io::Error) -> Self {
        ImageIoError::Io(e)
    }
}

impl From<ImageError> for ImageIoError {
    fn from(e: ImageError) -> Self {
        ImageIoError::Image(e)
    }
}

/// Output encodings the headless tool can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tga,
}

impl SaveFormat {
    /// Pick the format from a file extension; `None` for anything unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "webp" => Some(SaveFormat::Webp),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Webp => "webp",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
        }
    }
}

// ============================================================================
// SYNCHRONOUS IMAGE LOADER
// ============================================================================

/// Decode any raster format the `image` crate understands into a premultiplied
/// [`BoundedImage`] with its top-left corner at the canvas origin.
pub fn load_image_sync(path: &Path) -> Result<BoundedImage, ImageIoError> {
    let img: RgbaImage = image::open(path)?.to_rgba8();
    if img.width() > MAX_CANVAS_DIM || img.height() > MAX_CANVAS_DIM {
        return Err(ImageIoError::InvalidFormat(format!(
            "{}x{} exceeds the {}x{} limit",
            img.width(),
            img.height(),
            MAX_CANVAS_DIM,
            MAX_CANVAS_DIM
        )));
    }
    Ok(BoundedImage::from_straight_rgba(0, 0, &img))
}

/// Straight-alpha export of `rect` out of `image`, ready for an encoder.
pub fn export_region(image: &BoundedImage, rect: IntRect) -> RgbaImage {
    image.to_straight_rgba(rect)
}

// ============================================================================
// ENCODER
// ============================================================================

/// Encode and write a straight-alpha image. JPEG drops the alpha channel.
pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<(), ImageIoError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ImageIoError::InvalidFormat(
            "refusing to write an empty image".to_string(),
        ));
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Webp => {
            drop(writer);
            DynamicImage::ImageRgba8(image.clone()).save(path)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Tga => {
            let encoder = TgaEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
    }

    Ok(())
}
