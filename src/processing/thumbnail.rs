//! Aspect-preserving thumbnails of premultiplied images.
//!
//! Sources are un-premultiplied, box-filtered with `fast_image_resize`, then
//! premultiplied again. Images already inside the bound are never upscaled.

use fast_image_resize as fir;

use crate::bitmap::Image;
use crate::error::{Error, Result};
use crate::processing::pixels;

/// Target dimensions for fitting `width x height` inside `max_w x max_h`.
///
/// Aspect ratio is preserved and the result never exceeds the source size.
pub fn fit_within(width: i32, height: i32, max_w: i32, max_h: i32) -> (i32, i32) {
    if width <= 0 || height <= 0 {
        return (0, 0);
    }
    let scale = scale_factor(width, height, max_w, max_h);
    if scale >= 1.0 {
        return (width, height);
    }
    let w = (width as f64 * scale).round().max(1.0) as i32;
    let h = (height as f64 * scale).round().max(1.0) as i32;
    (w, h)
}

fn scale_factor(width: i32, height: i32, max_w: i32, max_h: i32) -> f64 {
    (max_w as f64 / width as f64).min(max_h as f64 / height as f64)
}

/// Produces an aspect-preserving thumbnail of `src` bounded by `max_w x max_h`.
///
/// Sources that already fit are copied at their original size. Otherwise the
/// texels are un-premultiplied, box-filtered down and premultiplied again so
/// partially transparent edges do not darken.
pub fn thumbnail(src: &Image, max_w: i32, max_h: i32) -> Result<Image> {
    if max_w <= 0 || max_h <= 0 {
        return Err(Error::InvalidBounds { max_w, max_h });
    }
    if !src.is_valid() {
        return Err(Error::Resize("source image is empty".into()));
    }

    let (target_w, target_h) = fit_within(src.width(), src.height(), max_w, max_h);
    if (target_w, target_h) == (src.width(), src.height()) {
        return Ok(src.duplicate());
    }

    let straight = pixels::unpremultiply_to_rgba8(src.pixels());
    let resized = resize_rgba(
        &straight,
        (src.width() as u32, src.height() as u32),
        (target_w as u32, target_h as u32),
    )?;
    let argb = pixels::premultiply_rgba8(&resized);
    Image::from_argb(target_w, target_h, argb)
        .ok_or_else(|| Error::Resize("resampler returned a short buffer".into()))
}

fn resize_rgba(
    source: &[u8],
    (src_w, src_h): (u32, u32),
    (dst_w, dst_h): (u32, u32),
) -> Result<Vec<u8>> {
    let src_view = fir::images::ImageRef::new(src_w, src_h, source, fir::PixelType::U8x4)
        .map_err(|err| Error::Resize(format!("source view: {err}")))?;
    let mut dst_image = fir::images::Image::new(dst_w, dst_h, fir::PixelType::U8x4);
    // Straight-alpha input: the resizer weights color by alpha while filtering.
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Box));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|err| Error::Resize(err.to_string()))?;
    Ok(dst_image.into_vec())
}
