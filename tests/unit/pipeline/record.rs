use super::*;

fn record(results: Vec<ValidationResult>, error: Option<AttemptError>) -> AttemptRecord {
    AttemptRecord {
        index: 1,
        constraints: AttemptConstraints::baseline(),
        composite: None,
        overall_pass: results.iter().all(ValidationResult::passed) && error.is_none(),
        results,
        error,
        outcome: Stage::Retrying,
    }
}

#[test]
fn failed_checks_and_summary() {
    let r = record(
        vec![
            ValidationResult::pass("legibility"),
            ValidationResult::fail("visual_integrity", "face (0.91)"),
        ],
        None,
    );
    assert_eq!(r.failed_checks(), vec!["visual_integrity"]);
    assert!(r.reached_validation());
    assert_eq!(r.summary(), "visual_integrity: face (0.91)");
}

#[test]
fn attempt_error_keeps_kind_and_service() {
    let err = ThumbError::timeout(ServiceKind::Synthesis, std::time::Duration::from_secs(90));
    let e = AttemptError::from(&err);
    assert_eq!(e.kind, ErrorKind::ServiceTimeout);
    assert_eq!(e.service, Some(ServiceKind::Synthesis));
    let r = record(Vec::new(), Some(e));
    assert!(!r.reached_validation());
    assert!(r.summary().starts_with("ServiceTimeout: "));
}

#[test]
fn record_json_omits_pixels_and_round_trips() {
    let r = record(vec![ValidationResult::fail("text_fidelity", "garbled")], None);
    let json = serde_json::to_value(&r).unwrap();
    assert!(json.get("composite").is_none());
    assert_eq!(json["outcome"], "retrying");
    assert_eq!(json["results"][0]["check_name"], "text_fidelity");

    let back: AttemptRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back.failed_checks(), vec!["text_fidelity"]);
    assert!(back.composite.is_none());
}

#[test]
fn failed_result_serializes_with_status_tag() {
    let result = PipelineResult::Failed {
        error_type: ErrorKind::ConstraintViolation,
        message: "all 3 attempts failed".into(),
        failure_log: vec![record(Vec::new(), None)],
        fallback_image: ArtifactRef::Path("outputs/fallback.png".into()),
        fallback_pixels: Arc::new(image::RgbImage::new(1, 1)),
    };
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["error_type"], "ConstraintViolation");
    assert_eq!(json["fallback_image"]["path"], "outputs/fallback.png");
    assert!(json.get("fallback_pixels").is_none());
    assert_eq!(result.attempts(), 1);
    assert!(!result.is_success());
}
