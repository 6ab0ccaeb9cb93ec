use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::{ImageReader, RgbaImage, imageops};
use tracing::debug;

use crate::bitmap::Image;
use crate::config::DecodeOptions;
use crate::error::{Error, Result};

/// Decodes `path` with default options.
pub fn decode(path: &Path) -> Result<Image> {
    decode_with(path, &DecodeOptions::default())
}

/// Decodes `path` to a premultiplied ARGB [`Image`].
///
/// The raster decoder is asked for RGBA8; EXIF orientation is applied when
/// enabled. Unreadable, unsupported, corrupt and zero-sized files are errors.
pub fn decode_with(path: &Path, opts: &DecodeOptions) -> Result<Image> {
    let rgba = decode_rgba8(path, opts)?;
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(Error::EmptyImage(path.to_path_buf()));
    }
    Image::from_rgba8(&rgba).ok_or_else(|| Error::EmptyImage(path.to_path_buf()))
}

fn decode_rgba8(path: &Path, opts: &DecodeOptions) -> Result<RgbaImage> {
    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let img = ImageReader::open(path)
        .map_err(io_err)?
        // sniff based on content, not only the extension
        .with_guessed_format()
        .map_err(io_err)?
        .decode()
        .map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let img = img.to_rgba8();
    if !opts.apply_exif_orientation {
        return Ok(img);
    }
    let orientation = read_orientation(path).unwrap_or(1);
    Ok(apply_orientation(img, orientation))
}

/// Maps the eight EXIF orientations onto flips and rotations.
fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    match orientation {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        // transpose
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        // transverse
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    debug!("exif orientation {} for {}", o, path.display());
    Some(o)
}
