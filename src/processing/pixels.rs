//! Texel conversions between straight RGBA8 bytes and packed premultiplied ARGB.

#[inline]
pub const fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Returns `[a, r, g, b]`.
#[inline]
pub const fn unpack_argb(texel: u32) -> [u8; 4] {
    [
        (texel >> 24) as u8,
        (texel >> 16) as u8,
        (texel >> 8) as u8,
        texel as u8,
    ]
}

#[inline]
fn scale_by_alpha(c: u8, a: u8) -> u8 {
    ((c as u16 * a as u16 + 127) / 255) as u8
}

#[inline]
fn divide_by_alpha(c: u8, a: u8) -> u8 {
    let a = a as u32;
    ((c as u32 * 255 + a / 2) / a).min(255) as u8
}

/// Premultiplies one straight-alpha RGBA texel into packed ARGB.
#[inline]
pub fn premultiply(rgba: [u8; 4]) -> u32 {
    let [r, g, b, a] = rgba;
    match a {
        0 => 0,
        255 => pack_argb(255, r, g, b),
        _ => pack_argb(
            a,
            scale_by_alpha(r, a),
            scale_by_alpha(g, a),
            scale_by_alpha(b, a),
        ),
    }
}

/// Inverse of [`premultiply`]. Fully transparent texels come back as zero.
#[inline]
pub fn unpremultiply(texel: u32) -> [u8; 4] {
    let [a, r, g, b] = unpack_argb(texel);
    match a {
        0 => [0, 0, 0, 0],
        255 => [r, g, b, 255],
        _ => [
            divide_by_alpha(r, a),
            divide_by_alpha(g, a),
            divide_by_alpha(b, a),
            a,
        ],
    }
}

/// Converts a straight RGBA8 byte buffer into premultiplied ARGB texels.
pub fn premultiply_rgba8(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|px| premultiply([px[0], px[1], px[2], px[3]]))
        .collect()
}

/// Converts premultiplied ARGB texels into a straight RGBA8 byte buffer.
pub fn unpremultiply_to_rgba8(texels: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(texels.len() * 4);
    for &texel in texels {
        out.extend_from_slice(&unpremultiply(texel));
    }
    out
}
