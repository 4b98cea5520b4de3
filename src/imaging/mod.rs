//! Image normalization.
//!
//! Every image is scaled to cover the panel and center-cropped so the output
//! is exactly the target resolution, then re-encoded as JPEG.
//!
//! | Step | Implementation |
//! |---|---|
//! | Geometry | [`plan_crop`], pure integer math |
//! | Resample | Lanczos3 via `image::DynamicImage::resize_exact` |
//! | Crop | `crop_imm` at the planned offset |
//! | Encode | `JpegEncoder` at the configured quality |

use crate::models::NormalizedImage;
use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Default JPEG quality.
pub const DEFAULT_QUALITY: u8 = 90;

/// Largest scaled area, as a multiple of the target area, that is resampled
/// whole. Beyond it only the source window under the crop is resampled.
const MAX_OVERSCAN: u64 = 4;

/// Scale and crop plan for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    /// Width after scaling.
    pub scaled_width: u32,
    /// Height after scaling.
    pub scaled_height: u32,
    /// Left edge of the crop window.
    pub left: u32,
    /// Top edge of the crop window.
    pub top: u32,
}

impl CropPlan {
    /// Area of the scaled image in pixels.
    #[must_use]
    pub fn scaled_area(&self) -> u64 {
        u64::from(self.scaled_width) * u64::from(self.scaled_height)
    }

    /// Maps the crop window back onto the source image.
    ///
    /// Returns `(x, y, width, height)` in source pixels, at least one pixel
    /// on each side and always inside the source bounds.
    #[must_use]
    pub fn source_window(
        &self,
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> (u32, u32, u32, u32) {
        let (x, width) = window_span(self.left, target_width, self.scaled_width, source_width);
        let (y, height) = window_span(self.top, target_height, self.scaled_height, source_height);
        (x, y, width, height)
    }
}

/// Projects `[offset, offset + len)` of a `scaled`-long axis onto a
/// `source`-long one.
fn window_span(offset: u32, len: u32, scaled: u32, source: u32) -> (u32, u32) {
    let (offset, len, scaled, source) = (
        u64::from(offset),
        u64::from(len),
        u64::from(scaled).max(1),
        u64::from(source).max(1),
    );
    let start = (offset * source / scaled).min(source - 1);
    let span = (len * source / scaled).clamp(1, source - start);
    // Both values are bounded by `source`, which came from a u32.
    (
        u32::try_from(start).unwrap_or(u32::MAX),
        u32::try_from(span).unwrap_or(1),
    )
}

/// Computes the cover-scale and center-crop geometry.
///
/// Wider-than-target sources are scaled to the target height, everything else
/// to the target width. The other side is floored, and the crop offset is
/// `(scaled - target) / 2` with integer division, so an odd overhang drops its
/// last pixel on the right/bottom.
///
/// # Errors
///
/// Returns [`Error::Dimension`] if any dimension is zero.
pub fn plan_crop(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
) -> Result<CropPlan> {
    if source_width == 0 || source_height == 0 {
        return Err(Error::Dimension {
            width: source_width,
            height: source_height,
        });
    }
    if target_width == 0 || target_height == 0 {
        return Err(Error::Dimension {
            width: target_width,
            height: target_height,
        });
    }

    let (sw, sh) = (u64::from(source_width), u64::from(source_height));
    let (tw, th) = (u64::from(target_width), u64::from(target_height));

    // sw/sh > tw/th, compared without floating point
    let (scaled_w, scaled_h) = if sw * th > tw * sh {
        ((th * sw / sh).max(tw), th)
    } else {
        (tw, (tw * sh / sw).max(th))
    };

    let scaled_width = u32::try_from(scaled_w).map_err(|_| Error::Dimension {
        width: source_width,
        height: source_height,
    })?;
    let scaled_height = u32::try_from(scaled_h).map_err(|_| Error::Dimension {
        width: source_width,
        height: source_height,
    })?;

    Ok(CropPlan {
        scaled_width,
        scaled_height,
        left: (scaled_width - target_width) / 2,
        top: (scaled_height - target_height) / 2,
    })
}

/// Resizes and crops images to a fixed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    width: u32,
    height: u32,
    quality: u8,
}

impl Normalizer {
    /// Creates a normalizer for the given output size at the default quality.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            quality: DEFAULT_QUALITY,
        }
    }

    /// Sets the JPEG quality (clamped to 1-100).
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Output width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Output height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Decodes, resizes, crops and re-encodes `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the bytes are not a supported raster
    /// image and [`Error::Dimension`] if the image has no pixels.
    pub fn normalize(&self, bytes: &[u8]) -> Result<NormalizedImage> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::Decode(format!("failed to decode image: {e}")))?;
        let (src_w, src_h) = img.dimensions();
        let plan = plan_crop(src_w, src_h, self.width, self.height)?;

        tracing::debug!(
            source = %format!("{src_w}x{src_h}"),
            scaled = %format!("{}x{}", plan.scaled_width, plan.scaled_height),
            left = plan.left,
            top = plan.top,
            "Normalizing image"
        );

        let target_area = u64::from(self.width) * u64::from(self.height);
        let cropped = if plan.scaled_area() > target_area.saturating_mul(MAX_OVERSCAN) {
            let (x, y, w, h) = plan.source_window(src_w, src_h, self.width, self.height);
            tracing::debug!(x, y, width = w, height = h, "Resampling source window only");
            img.crop_imm(x, y, w, h)
                .resize_exact(self.width, self.height, FilterType::Lanczos3)
        } else {
            let scaled = if (src_w, src_h) == (plan.scaled_width, plan.scaled_height) {
                img
            } else {
                img.resize_exact(plan.scaled_width, plan.scaled_height, FilterType::Lanczos3)
            };
            scaled.crop_imm(plan.left, plan.top, self.width, self.height)
        };

        Ok(NormalizedImage {
            bytes: self.encode(&cropped)?,
            width: self.width,
            height: self.height,
        })
    }

    fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut out = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, self.quality))
            .map_err(|e| Error::Decode(format!("failed to encode JPEG: {e}")))?;
        Ok(out)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(3840, 2160)
    }
}
