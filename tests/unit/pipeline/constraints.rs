use super::*;

fn strictly_extends(prev: &AttemptConstraints, next: &AttemptConstraints) -> bool {
    next.exclusions.len() > prev.exclusions.len()
        && next.exclusions.starts_with(&prev.exclusions)
        && next
            .semantic_restriction_text()
            .starts_with(&prev.semantic_restriction_text())
        && next.negative_prompt_strength > prev.negative_prompt_strength
}

#[test]
fn baseline_is_empty() {
    let c = AttemptConstraints::baseline();
    assert_eq!(c.negative_prompt_strength, 0);
    assert_eq!(c.semantic_restriction_text(), "");
    assert_eq!(c.stroke_boost, 0);
}

#[test]
fn escalation_is_monotonic_for_any_failure_mix() {
    let mixes: [&[&str]; 5] = [
        &[],
        &["visual_integrity"],
        &["text_fidelity", "mobile_readability"],
        &["legibility"],
        &["visual_integrity", "text_fidelity"],
    ];
    let mut c = AttemptConstraints::baseline();
    for round in 0..12 {
        let next = c.escalate(mixes[round % mixes.len()]);
        assert!(strictly_extends(&c, &next), "round {round}");
        c = next;
    }
}

#[test]
fn visual_failure_adds_face_and_hand_exclusions() {
    let c = AttemptConstraints::baseline().escalate(&["visual_integrity"]);
    let text = c.semantic_restriction_text();
    assert!(text.contains("Strictly NO people or faces."));
    assert!(text.contains("hands"));
    assert_eq!(c.stroke_boost, 0);
}

#[test]
fn typography_failures_widen_outline() {
    let c = AttemptConstraints::baseline().escalate(&["text_fidelity", "mobile_readability"]);
    assert_eq!(c.stroke_boost, 2);
    let again = c.escalate(&["text_fidelity"]);
    assert_eq!(again.stroke_boost, 3);
    assert_eq!(
        again
            .exclusions
            .iter()
            .filter(|e| e.contains("lower third"))
            .count(),
        1
    );
}

#[test]
fn rungs_continue_past_the_ladder() {
    let mut c = AttemptConstraints::baseline();
    for _ in 0..6 {
        c = c.escalate(&[]);
    }
    assert_eq!(c.negative_prompt_strength, 6);
    assert_eq!(c.exclusions.len(), 6);
    assert!(c.exclusions[5].ends_with("Restriction level 6."));
}
