use crate::error::{Error, Result};
use image::error::UnsupportedErrorKind;
use image::{DynamicImage, ImageError, ImageFormat, RgbImage, imageops};
use std::path::Path;
use std::sync::Arc;

/// Decoded RGB raster of an uploaded photo.
///
/// Cloning is cheap; the pixel buffer is shared and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSample {
    pixels: Arc<RgbImage>,
}

impl ImageSample {
    /// Decode JPEG or PNG bytes. Anything else is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes).map_err(map_decode_error)?;
        if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
            return Err(Error::UnsupportedImageFormat(format!(
                "{format:?} (expected JPEG or PNG)"
            )));
        }
        let img = image::load_from_memory_with_format(bytes, format).map_err(map_decode_error)?;
        Self::from_dynamic(img)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::decode(&bytes)
    }

    /// Convert any decoded raster to 3-channel RGB, dropping alpha and
    /// expanding grayscale.
    pub fn from_dynamic(img: DynamicImage) -> Result<Self> {
        if img.width() == 0 || img.height() == 0 {
            return Err(Error::UnsupportedImageFormat("image has no pixels".into()));
        }
        Ok(Self::from_rgb(img.to_rgb8()))
    }

    pub fn from_rgb(rgb: RgbImage) -> Self {
        Self {
            pixels: Arc::new(rgb),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Copy scaled down to fit a `max_side` square, aspect preserved.
    /// Smaller images are copied at their own size.
    pub fn thumbnail(&self, max_side: u32) -> RgbImage {
        let (w, h) = fit_within(self.width(), self.height(), max_side);
        imageops::thumbnail(self.pixels.as_ref(), w, h)
    }
}

pub(crate) fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width.max(1), height.max(1));
    }
    let scale = max as f32 / width.max(height) as f32;
    let w = ((width as f32 * scale).round() as u32).clamp(1, max);
    let h = ((height as f32 * scale).round() as u32).clamp(1, max);
    (w, h)
}

fn map_decode_error(err: ImageError) -> Error {
    match err {
        ImageError::Unsupported(e) if matches!(e.kind(), UnsupportedErrorKind::Color(_)) => {
            Error::ChannelConversionError(e.to_string())
        }
        other => Error::UnsupportedImageFormat(other.to_string()),
    }
}
