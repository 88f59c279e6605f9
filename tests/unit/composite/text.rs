use super::*;

fn single_dot(w: u32, h: u32, x: u32, y: u32) -> GlyphMask {
    let mut coverage = vec![0u8; (w * h) as usize];
    coverage[(y * w + x) as usize] = 255;
    GlyphMask::new(w, h, coverage).unwrap()
}

#[test]
fn mask_rejects_wrong_length() {
    assert!(GlyphMask::new(2, 2, vec![0; 3]).is_err());
}

#[test]
fn padded_keeps_content_at_offset() {
    let m = single_dot(2, 1, 1, 0).padded(2);
    assert_eq!((m.width, m.height), (6, 5));
    assert_eq!(m.at(3, 2), 255);
    assert_eq!(m.coverage.iter().filter(|&&c| c != 0).count(), 1);
}

#[test]
fn dilation_grows_a_square() {
    let m = single_dot(7, 7, 3, 3).dilated(2);
    let covered = m.coverage.iter().filter(|&&c| c == 255).count();
    assert_eq!(covered, 25);
    assert_eq!(m.at(1, 1), 255);
    assert_eq!(m.at(0, 0), 0);
    assert_eq!(single_dot(3, 3, 1, 1).dilated(0), single_dot(3, 3, 1, 1));
}

#[test]
fn dilation_clips_at_edges() {
    let m = single_dot(3, 3, 0, 0).dilated(1);
    assert_eq!(m.coverage.iter().filter(|&&c| c == 255).count(), 4);
}

#[test]
fn covered_fraction_counts_partial_coverage() {
    let m = GlyphMask::new(2, 1, vec![255, 0]).unwrap();
    assert!((m.covered_fraction() - 0.5).abs() < 1e-12);
}

#[test]
fn tone_contrasts_with_backdrop() {
    assert_eq!(TextTone::against(0.1), TextTone::Light);
    assert_eq!(TextTone::against(0.9), TextTone::Dark);
    assert_ne!(TextTone::Light.fill(), TextTone::Light.outline());
}

#[test]
fn parley_rasterizer_renders_deterministic_glyphs() {
    let Ok(font) = FontSource::discover_system() else {
        eprintln!("skipping: no system font installed");
        return;
    };
    let r = ParleyRasterizer::new(font).unwrap();
    let lines = vec!["AI TAKEOVER".to_string()];

    let a = r.rasterize(&lines, 64.0).unwrap();
    let b = r.rasterize(&lines, 64.0).unwrap();
    assert_eq!(a, b);
    assert!(a.width > a.height);
    assert!(a.covered_fraction() > 0.02);

    let small = r.rasterize(&lines, 32.0).unwrap();
    assert!(small.width < a.width);
    assert!(r.rasterize(&lines, 0.0).is_err());
}

#[test]
fn parley_rasterizer_rejects_missing_face_index() {
    let Ok(font) = FontSource::discover_system() else {
        eprintln!("skipping: no system font installed");
        return;
    };
    let missing = FontSource {
        bytes: font.bytes.clone(),
        index: 999,
    };
    let err = ParleyRasterizer::new(missing).unwrap_err();
    assert!(err.to_string().contains("index 999"), "{err}");
}

#[test]
fn parley_rasterizer_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ParleyRasterizer>();
}
