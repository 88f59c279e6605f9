use super::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn ratio_matches_known_values() {
    assert!(close(ratio("abcd", "bcde"), 0.75));
    assert!(close(ratio("ai takeover", "ai takeover"), 1.0));
    assert!(close(ratio("abc", "xyz"), 0.0));
    assert!(close(ratio("", ""), 1.0));
    assert!(close(ratio("abc", ""), 0.0));
    // "qabxcd" vs "abycdf": blocks "ab" and "cd".
    assert!(close(ratio("qabxcd", "abycdf"), 8.0 / 12.0));
}

#[test]
fn normalize_strips_case_and_punctuation() {
    assert_eq!(normalize("  It's   The END!\n"), "it s the end");
    assert_eq!(normalize("AI-TAKEOVER"), "ai takeover");
    assert_eq!(normalize("..."), "");
}

#[test]
fn similarity_tolerates_ocr_noise() {
    assert!(similarity("End of the World", "END OF THE W0RLD") > 0.9);
    assert!(similarity("AI Takeover", "Al TAKEOVER") > 0.8);
    assert!(similarity("AI Takeover", "") < 0.01);
    assert!(similarity("AI Takeover", "banana bread") < 0.5);
}
