use image::{Rgba, RgbaImage};
use thumb_engine::processing::pixels;
use thumb_engine::{Image, decode, thumbnail};

fn gradient(width: u32, height: u32, alpha: u8) -> Image {
    let rgba = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 3 % 256) as u8, ((x + y) % 256) as u8, alpha])
    });
    Image::from_rgba8(&rgba).unwrap()
}

#[test]
fn never_upscales() {
    for (w, h) in [(1, 1), (10, 40), (256, 256), (100, 3)] {
        let img = gradient(w, h, 255);
        let thumb = thumbnail(&img, 256, 256).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (w as i32, h as i32));
        assert_eq!(thumb, img);
    }
}

#[test]
fn landscape_preserves_aspect() {
    for (w, h, bound) in [(300u32, 200u32, 64i32), (1000, 333, 256), (517, 101, 50)] {
        let img = gradient(w, h, 255);
        let thumb = thumbnail(&img, bound, bound).unwrap();
        let expected_h = (bound as f64 * h as f64 / w as f64).round() as i32;
        assert_eq!(thumb.width(), bound);
        assert!(
            (thumb.height() - expected_h).abs() <= 1,
            "{w}x{h} -> {}x{}",
            thumb.width(),
            thumb.height()
        );
    }
}

#[test]
fn portrait_is_bounded_by_height() {
    let img = gradient(90, 300, 255);
    let thumb = thumbnail(&img, 100, 100).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (30, 100));
}

#[test]
fn opaque_stays_opaque_at_any_scale() {
    let img = gradient(257, 129, 255);
    for bound in [1, 2, 17, 64, 128, 200] {
        let thumb = thumbnail(&img, bound, bound).unwrap();
        assert!(
            thumb.pixels().iter().all(|&px| px >> 24 == 0xff),
            "alpha lost at bound {bound}"
        );
    }
}

#[test]
fn fully_transparent_stays_transparent() {
    let img = gradient(64, 64, 0);
    let thumb = thumbnail(&img, 16, 16).unwrap();
    assert!(thumb.pixels().iter().all(|&px| px == 0));
}

#[test]
fn result_is_premultiplied() {
    let img = gradient(80, 80, 100);
    let thumb = thumbnail(&img, 20, 20).unwrap();
    for &px in thumb.pixels() {
        let [a, r, g, b] = pixels::unpack_argb(px);
        assert!(r <= a && g <= a && b <= a, "texel {px:#010x} not premultiplied");
    }
}

#[test]
fn decoded_file_thumbnails_like_in_memory() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("g.png");
    RgbaImage::from_pixel(120, 60, Rgba([1, 2, 3, 255]))
        .save(&path)
        .unwrap();
    let img = decode(&path).unwrap();
    let thumb = thumbnail(&img, 30, 30).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (30, 15));
    assert!(thumb.pixels().iter().all(|&px| px == pixels::pack_argb(255, 1, 2, 3)));
}
