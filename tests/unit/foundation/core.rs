use std::io::Cursor;

use super::*;

fn encode_png(img: image::DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn canvas_rejects_zero_dimensions() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    assert_eq!(Canvas::new(1280, 720).unwrap(), Canvas::THUMBNAIL);
}

#[test]
fn region_clamp_and_containment() {
    let canvas = Canvas::new(100, 50).unwrap();
    let r = RegionRect::new(90, 40, 30, 30).clamp_to(canvas);
    assert_eq!(r, RegionRect::new(90, 40, 10, 10));

    let outer = RegionRect::new(0, 0, 100, 50);
    assert!(outer.contains_rect(r));
    assert!(!r.contains_rect(outer));
    assert!(RegionRect::new(3, 3, 0, 4).is_empty());
}

#[test]
fn from_encoded_resizes_to_canvas() {
    let canvas = Canvas::new(64, 36).unwrap();
    let src = image::RgbImage::from_pixel(32, 32, image::Rgb([10, 200, 30]));
    let bytes = encode_png(image::DynamicImage::ImageRgb8(src));

    let bg = Background::from_encoded(&bytes, canvas).unwrap();
    assert_eq!(bg.canvas(), canvas);
    assert_eq!(bg.pixels().get_pixel(10, 10).0, [10, 200, 30]);
}

#[test]
fn from_encoded_drops_alpha() {
    let canvas = Canvas::new(4, 4).unwrap();
    let src = image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 128]));
    let bytes = encode_png(image::DynamicImage::ImageRgba8(src));
    let bg = Background::from_encoded(&bytes, canvas).unwrap();
    assert_eq!(bg.pixels().get_pixel(0, 0).0, [1, 2, 3]);
}

#[test]
fn from_encoded_rejects_empty_garbage_and_grayscale() {
    let canvas = Canvas::new(4, 4).unwrap();
    assert!(matches!(
        Background::from_encoded(&[], canvas),
        Err(ThumbError::Synthesis(_))
    ));
    assert!(matches!(
        Background::from_encoded(b"not an image", canvas),
        Err(ThumbError::Synthesis(_))
    ));

    let gray = image::GrayImage::from_pixel(4, 4, image::Luma([9]));
    let bytes = encode_png(image::DynamicImage::ImageLuma8(gray));
    assert!(matches!(
        Background::from_encoded(&bytes, canvas),
        Err(ThumbError::Synthesis(_))
    ));
}

#[test]
fn from_rgb_checks_dimensions() {
    let canvas = Canvas::new(8, 8).unwrap();
    let wrong = image::RgbImage::new(8, 9);
    assert!(Background::from_rgb(wrong, canvas).is_err());
    let solid = Background::solid(canvas, [1, 2, 3]);
    assert_eq!(solid.pixels().get_pixel(7, 7).0, [1, 2, 3]);
}
