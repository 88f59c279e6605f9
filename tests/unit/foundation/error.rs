use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ThumbError::decomposition("x")
            .to_string()
            .contains("decomposition error:")
    );
    assert!(
        ThumbError::synthesis("x")
            .to_string()
            .contains("synthesis error:")
    );
    assert!(
        ThumbError::validation("legibility", "too flat")
            .to_string()
            .contains("validation error: legibility: too flat")
    );
    assert!(
        ThumbError::constraint_violation("x")
            .to_string()
            .contains("constraint violation:")
    );
}

#[test]
fn timeout_names_service_and_deadline() {
    let err = ThumbError::timeout(ServiceKind::Synthesis, Duration::from_millis(1500));
    let s = err.to_string();
    assert!(s.contains("image synthesis"));
    assert!(s.contains("1500ms"));
    assert_eq!(err.kind(), ErrorKind::ServiceTimeout);
    assert_eq!(err.service(), Some(ServiceKind::Synthesis));
}

#[test]
fn kinds_map_one_to_one() {
    assert_eq!(
        ThumbError::decomposition("x").kind(),
        ErrorKind::DecompositionError
    );
    assert_eq!(ThumbError::synthesis("x").kind(), ErrorKind::SynthesisError);
    assert_eq!(
        ThumbError::composition("x").kind(),
        ErrorKind::CompositionError
    );
    assert_eq!(ThumbError::storage("x").kind(), ErrorKind::StorageError);
    assert_eq!(ThumbError::config("x").kind(), ErrorKind::ConfigError);
}

#[test]
fn error_kind_serializes_as_variant_name() {
    let json = serde_json::to_string(&ErrorKind::ConstraintViolation).unwrap();
    assert_eq!(json, "\"ConstraintViolation\"");
    assert_eq!(ErrorKind::SynthesisError.to_string(), "SynthesisError");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ThumbError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.kind(), ErrorKind::Other);
}
