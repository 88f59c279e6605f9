use super::*;

fn region() -> RegionRect {
    RegionRect::new(100, 400, 600, 100)
}

#[test]
fn weight_peaks_at_center_and_vanishes_at_edge() {
    let g = GradientParams::around(region(), OverlayTone::Darken, 0.8, 4.0);
    assert!((g.weight_at(0.0) - 0.8).abs() < 1e-12);
    assert_eq!(g.weight_at(1.0), 0.0);
    assert_eq!(g.weight_at(3.0), 0.0);
    assert!(g.weight_at(0.99) < 0.01);
}

#[test]
fn weight_decays_exponentially_not_linearly() {
    let g = GradientParams::around(region(), OverlayTone::Darken, 1.0, 4.0);
    let quarter = g.weight_at(0.25);
    let half = g.weight_at(0.5);
    // A linear ramp would give 0.75 and 0.5.
    assert!(quarter < 0.4);
    assert!(half < 0.15);
    let mut prev = g.weight_at(0.0);
    for i in 1..=10 {
        let w = g.weight_at(f64::from(i) / 10.0);
        assert!(w < prev);
        prev = w;
    }
}

#[test]
fn band_is_centered_and_clipped() {
    let g = GradientParams::around(region(), OverlayTone::Darken, 1.0, 4.0);
    let band = g.band(Canvas::THUMBNAIL);
    assert_eq!(band.y, 350);
    assert_eq!(band.bottom(), 550);
    assert_eq!(band.width, 1280);

    let low = GradientParams::around(RegionRect::new(0, 650, 10, 60), OverlayTone::Darken, 1.0, 4.0);
    assert_eq!(low.band(Canvas::THUMBNAIL).bottom(), 720);
}

#[test]
fn row_weights_have_no_step_at_band_boundary() {
    let g = GradientParams::around(region(), OverlayTone::Darken, 1.0, 4.0);
    let band = g.band(Canvas::THUMBNAIL);
    assert!(g.row_weight(band.y) <= 2);
    assert!(g.row_weight(band.bottom() - 1) <= 2);
    assert_eq!(g.row_weight(band.y.saturating_sub(1)), 0);
    assert_eq!(g.row_weight(450), 255);
}

#[test]
fn apply_darkens_and_lightens_toward_target() {
    let mut light = image::RgbImage::from_pixel(10, 20, image::Rgb([200, 200, 200]));
    let g = GradientParams::around(RegionRect::new(0, 8, 10, 4), OverlayTone::Darken, 1.0, 2.5);
    g.apply(&mut light);
    assert!(light.get_pixel(5, 10).0[0] < 20);
    assert_eq!(light.get_pixel(5, 0).0, [200, 200, 200]);

    let mut dark = image::RgbImage::from_pixel(10, 20, image::Rgb([20, 20, 20]));
    let g = GradientParams::around(RegionRect::new(0, 8, 10, 4), OverlayTone::Lighten, 1.0, 2.5);
    g.apply(&mut dark);
    assert!(dark.get_pixel(5, 10).0[0] > 230);
}

#[test]
fn tone_follows_mean_luma() {
    assert_eq!(OverlayTone::for_mean_luma(0.8), OverlayTone::Darken);
    assert_eq!(OverlayTone::for_mean_luma(0.5), OverlayTone::Darken);
    assert_eq!(OverlayTone::for_mean_luma(0.2), OverlayTone::Lighten);
}

#[test]
fn search_stops_at_first_passing_candidate() {
    let ladder = search_ladder(region(), OverlayTone::Darken);
    assert_eq!(ladder.len(), 18);
    assert!(ladder.windows(2).all(|w| w[0] != w[1]));

    let (chosen, c) = search(&ladder, 0.15, |p| p.peak * 0.2).unwrap();
    assert!(c >= 0.15);
    assert_eq!(chosen.peak, 0.8);
    assert_eq!(chosen.decay, 4.0);
}

#[test]
fn search_falls_back_to_strongest_candidate() {
    let ladder = search_ladder(region(), OverlayTone::Lighten);
    let (chosen, c) = search(&ladder, 0.15, |_| 0.01).unwrap();
    assert_eq!(c, 0.01);
    assert_eq!(chosen.peak, 1.0);
    assert_eq!(chosen.decay, 1.0);
    assert!(search(&[], 0.15, |_| 1.0).is_none());
}
