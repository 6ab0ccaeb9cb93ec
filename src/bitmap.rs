//! Owned premultiplied-ARGB pixel buffer shared by every stage of the engine.

use image::RgbaImage;

use crate::processing::pixels;

/// A decoded image: `width * height` premultiplied ARGB texels in row-major order.
///
/// An image owns its pixels exclusively. It is `Send` but deliberately not
/// `Clone`; copies are explicit via [`Image::duplicate`] so that a buffer handed
/// across the worker queue is moved, never shared.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Image {
    pixels: Vec<u32>,
    width: i32,
    height: i32,
}

impl Image {
    /// The empty sentinel: no pixels, zero size.
    pub const fn empty() -> Self {
        Self {
            pixels: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    /// Wraps premultiplied ARGB texels. Returns `None` if the buffer length does
    /// not match the dimensions; non-positive dimensions yield the empty image.
    pub fn from_argb(width: i32, height: i32, pixels: Vec<u32>) -> Option<Self> {
        if width <= 0 || height <= 0 {
            return pixels.is_empty().then(Self::empty);
        }
        let expected = (width as usize).checked_mul(height as usize)?;
        if pixels.len() != expected {
            return None;
        }
        Some(Self {
            pixels,
            width,
            height,
        })
    }

    /// Premultiplies a straight-alpha RGBA8 buffer.
    pub fn from_rgba8(rgba: &RgbaImage) -> Option<Self> {
        let width = i32::try_from(rgba.width()).ok()?;
        let height = i32::try_from(rgba.height()).ok()?;
        Self::from_argb(width, height, pixels::premultiply_rgba8(rgba.as_raw()))
    }

    /// Converts back to a straight-alpha RGBA8 buffer (for encoding to disk).
    pub fn to_rgba8(&self) -> RgbaImage {
        if !self.is_valid() {
            return RgbaImage::new(0, 0);
        }
        let bytes = pixels::unpremultiply_to_rgba8(&self.pixels);
        RgbaImage::from_raw(self.width as u32, self.height as u32, bytes)
            .unwrap_or_else(|| RgbaImage::new(0, 0))
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Returns the texel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// `true` iff the image has pixels (width and height both positive).
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.pixels.is_empty()
    }

    /// An independent deep copy.
    pub fn duplicate(&self) -> Self {
        Self {
            pixels: self.pixels.clone(),
            width: self.width,
            height: self.height,
        }
    }

    /// Gives up the pixel buffer.
    pub fn into_argb(self) -> Vec<u32> {
        self.pixels
    }
}
