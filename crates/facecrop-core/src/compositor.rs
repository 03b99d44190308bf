//! Crop preview and export rendering.
//!
//! The [`Compositor`] turns a source image plus a crop rectangle into
//! encoded output rasters: an annotated display-sized preview (PNG) and
//! the final cropped export (JPEG). It owns a reusable scratch buffer
//! across calls to avoid re-allocating per render; results are encoded
//! into fresh buffers on return, so callers never alias the scratch
//! state (copy-on-return).

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

use crate::geometry::{CropRect, FaceBox, Handle};
use crate::raster::RasterImage;

/// Longest edge of a rendered preview, in pixels.
pub const PREVIEW_MAX_DIM: u32 = 800;

/// Fixed JPEG quality for exports.
pub const EXPORT_JPEG_QUALITY: u8 = 95;

/// Brightness retained outside the crop region (60%).
const DIM_NUMERATOR: u16 = 153;

/// Outline thickness for the crop boundary and face box, in preview pixels.
const OUTLINE_THICKNESS: u32 = 3;

const CROP_OUTLINE: [u8; 3] = [0, 255, 0];
const FACE_OUTLINE: [u8; 3] = [255, 0, 0];
const HANDLE_FILL: [u8; 3] = [255, 255, 255];

/// Errors that can occur while rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The source image has no pixels.
    #[error("Source image is empty")]
    EmptyImage,

    /// The source pixel buffer does not match its stated dimensions.
    #[error("Source pixel buffer does not match {width}x{height}")]
    InvalidSource { width: u32, height: u32 },

    /// Encoding the output raster failed.
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

/// Container format of an [`EncodedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedFormat {
    /// Lossless, used for previews.
    Png,
    /// Lossy at [`EXPORT_JPEG_QUALITY`], used for exports.
    Jpeg,
}

/// An encoded output raster, independent of any compositor state.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Encoded container bytes.
    pub bytes: Vec<u8>,
    /// Pixel width of the encoded raster.
    pub width: u32,
    /// Pixel height of the encoded raster.
    pub height: u32,
    /// Container format of `bytes`.
    pub format: EncodedFormat,
}

/// Renders previews and exports, reusing one scratch raster across calls.
#[derive(Debug, Default)]
pub struct Compositor {
    scratch: Vec<u8>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a display-sized preview of the crop framing.
    ///
    /// The full image is shown capped at [`PREVIEW_MAX_DIM`] on its
    /// longest edge, dimmed outside `rect`, full brightness inside,
    /// with a crop-boundary outline, corner handle markers, and — when
    /// `face` is given — an outline around the detected face.
    ///
    /// Purely a function of its inputs: no state survives into the
    /// returned encoding.
    pub fn render_preview(
        &mut self,
        image: &RasterImage,
        rect: CropRect,
        face: Option<&FaceBox>,
    ) -> Result<EncodedImage, RenderError> {
        if image.is_empty() {
            return Err(RenderError::EmptyImage);
        }

        let longest = image.width.max(image.height);
        let scale = if longest > PREVIEW_MAX_DIM {
            PREVIEW_MAX_DIM as f64 / longest as f64
        } else {
            1.0
        };
        let pw = ((image.width as f64 * scale).round() as u32).max(1);
        let ph = ((image.height as f64 * scale).round() as u32).max(1);

        // Base raster at preview resolution.
        let base = if scale < 1.0 {
            let rgb = image.to_rgb_image().ok_or(RenderError::InvalidSource {
                width: image.width,
                height: image.height,
            })?;
            imageops::resize(&rgb, pw, ph, imageops::FilterType::Triangle).into_raw()
        } else {
            if image.pixels.len() != (pw * ph * 3) as usize {
                return Err(RenderError::InvalidSource {
                    width: image.width,
                    height: image.height,
                });
            }
            image.pixels.clone()
        };

        // Scratch holds the dimmed composite.
        self.scratch.clear();
        self.scratch
            .extend(base.iter().map(|&v| (v as u16 * DIM_NUMERATOR / 255) as u8));

        // Crop region in preview coordinates.
        let sx = ((rect.x * scale).round() as i64).clamp(0, pw as i64) as u32;
        let sy = ((rect.y * scale).round() as i64).clamp(0, ph as i64) as u32;
        let sr = ((rect.right() * scale).round() as i64).clamp(sx as i64, pw as i64) as u32;
        let sb = ((rect.bottom() * scale).round() as i64).clamp(sy as i64, ph as i64) as u32;

        // Restore the crop region to full brightness from the base.
        for y in sy..sb {
            let row = (y * pw + sx) as usize * 3;
            let row_end = (y * pw + sr) as usize * 3;
            self.scratch[row..row_end].copy_from_slice(&base[row..row_end]);
        }

        // Crop boundary.
        draw_outline(
            &mut self.scratch,
            pw,
            ph,
            sx,
            sy,
            sr,
            sb,
            OUTLINE_THICKNESS,
            CROP_OUTLINE,
        );

        // Corner handle markers, sized like the editor hit zones.
        let sw = (sr - sx) as f64;
        let sh = (sb - sy) as f64;
        let handle = (sw.min(sh) * 0.06).round().max(8.0) as u32;
        for h in Handle::ALL {
            let (hx, hy) = match h {
                Handle::Nw => (sx, sy),
                Handle::Ne => (sr, sy),
                Handle::Sw => (sx, sb),
                Handle::Se => (sr, sb),
            };
            let x0 = hx.saturating_sub(handle / 2);
            let y0 = hy.saturating_sub(handle / 2);
            fill_rect(
                &mut self.scratch,
                pw,
                ph,
                x0,
                y0,
                x0 + handle,
                y0 + handle,
                HANDLE_FILL,
            );
        }

        // Detected face, when present.
        if let Some(face) = face {
            let fx = ((face.origin_x * scale).round() as i64).clamp(0, pw as i64) as u32;
            let fy = ((face.origin_y * scale).round() as i64).clamp(0, ph as i64) as u32;
            let fr = (((face.origin_x + face.width) * scale).round() as i64)
                .clamp(fx as i64, pw as i64) as u32;
            let fb = (((face.origin_y + face.height) * scale).round() as i64)
                .clamp(fy as i64, ph as i64) as u32;
            draw_outline(
                &mut self.scratch,
                pw,
                ph,
                fx,
                fy,
                fr,
                fb,
                OUTLINE_THICKNESS,
                FACE_OUTLINE,
            );
        }

        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(&self.scratch, pw, ph, ExtendedColorType::Rgb8)
            .map_err(|e| RenderError::EncodingFailed(e.to_string()))?;

        Ok(EncodedImage {
            bytes,
            width: pw,
            height: ph,
            format: EncodedFormat::Png,
        })
    }

    /// Render the final export: the source cropped to `rect`, no
    /// overlays, JPEG-encoded at the crop's native resolution.
    ///
    /// Output dimensions are the rounded rect dimensions, shrunk only
    /// as needed to stay inside the source.
    pub fn render_export(
        &mut self,
        image: &RasterImage,
        rect: CropRect,
    ) -> Result<EncodedImage, RenderError> {
        if image.is_empty() {
            return Err(RenderError::EmptyImage);
        }
        if image.pixels.len() != (image.width * image.height * 3) as usize {
            return Err(RenderError::InvalidSource {
                width: image.width,
                height: image.height,
            });
        }

        // Integer crop window, clamped into the source.
        let px = (rect.x.round() as i64).clamp(0, image.width as i64 - 1) as u32;
        let py = (rect.y.round() as i64).clamp(0, image.height as i64 - 1) as u32;
        let out_w = (rect.width.round() as i64).max(1).min((image.width - px) as i64) as u32;
        let out_h = (rect.height.round() as i64).max(1).min((image.height - py) as i64) as u32;

        // Copy pixel rows into the scratch buffer.
        self.scratch.clear();
        self.scratch.reserve((out_w * out_h * 3) as usize);
        for y in 0..out_h {
            let src_y = py + y;
            let start = ((src_y * image.width + px) * 3) as usize;
            let end = start + (out_w * 3) as usize;
            self.scratch.extend_from_slice(&image.pixels[start..end]);
        }

        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, EXPORT_JPEG_QUALITY);
        encoder
            .write_image(&self.scratch, out_w, out_h, ExtendedColorType::Rgb8)
            .map_err(|e| RenderError::EncodingFailed(e.to_string()))?;

        Ok(EncodedImage {
            bytes,
            width: out_w,
            height: out_h,
            format: EncodedFormat::Jpeg,
        })
    }
}

/// Fill an axis-aligned rectangle, clipped to the canvas.
#[allow(clippy::too_many_arguments)]
fn fill_rect(pixels: &mut [u8], width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32, color: [u8; 3]) {
    let x1 = x1.min(width);
    let y1 = y1.min(height);
    for y in y0.min(height)..y1 {
        for x in x0.min(width)..x1 {
            let idx = ((y * width + x) * 3) as usize;
            pixels[idx..idx + 3].copy_from_slice(&color);
        }
    }
}

/// Draw a rectangle outline of the given thickness, clipped to the canvas.
#[allow(clippy::too_many_arguments)]
fn draw_outline(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
    thickness: u32,
    color: [u8; 3],
) {
    let t = thickness;
    // Top and bottom bands
    fill_rect(pixels, width, height, x0, y0, x1, y0 + t, color);
    fill_rect(pixels, width, height, x0, y1.saturating_sub(t), x1, y1, color);
    // Left and right bands
    fill_rect(pixels, width, height, x0, y0, x0 + t, y1, color);
    fill_rect(pixels, width, height, x1.saturating_sub(t), y0, x1, y1, color);
}


// ============================================================================
// Property-Based Tests
// ============================================================================
