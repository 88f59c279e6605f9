use std::collections::HashMap;
use std::io::Write as _;

use super::*;

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |k| map.get(k).cloned()
}

#[test]
fn defaults_validate() {
    let cfg = PipelineConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.canvas, Canvas::THUMBNAIL);
    assert_eq!(cfg.max_attempts, 3);
    assert_eq!(cfg.mobile_width, 200);
    assert_eq!(cfg.output_dir, PathBuf::from("outputs"));
    assert_eq!(cfg.timeouts(), ServiceTimeouts::default());
}

#[test]
fn partial_json_keeps_defaults_and_ignores_token() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"max_attempts": 2, "gateway": {{"base_url": "http://gw:9000/v1", "token": "leak"}}}}"#
    )
    .unwrap();
    let cfg = PipelineConfig::from_json_file(file.path()).unwrap();
    assert_eq!(cfg.max_attempts, 2);
    assert_eq!(cfg.gateway.base_url, "http://gw:9000/v1");
    assert_eq!(cfg.gateway.token, None);
    assert_eq!(cfg.gateway.chat_model, GatewayConfig::default().chat_model);
    assert_eq!(cfg.contrast_floor, 0.15);
}

#[test]
fn malformed_json_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    assert!(PipelineConfig::from_json_file(file.path()).is_err());
}

#[test]
fn env_overrides_apply() {
    let mut cfg = PipelineConfig::default();
    cfg.apply_vars(vars(&[
        ("THUMBFORGE_TOKEN", " sk-test "),
        ("THUMBFORGE_MAX_ATTEMPTS", "1"),
        ("THUMBFORGE_SKIP_CACHE", "off"),
        ("THUMBFORGE_OUTPUT_DIR", "/tmp/thumbs"),
        ("THUMBFORGE_REDECOMPOSE_ON_RETRY", "yes"),
        ("UNRELATED", "x"),
    ]))
    .unwrap();
    assert_eq!(cfg.gateway.token.as_deref(), Some("sk-test"));
    assert_eq!(cfg.max_attempts, 1);
    assert!(!cfg.gateway.skip_cache);
    assert_eq!(cfg.output_dir, PathBuf::from("/tmp/thumbs"));
    assert!(cfg.redecompose_on_retry);
    cfg.validate().unwrap();
}

#[test]
fn bad_env_values_are_config_errors() {
    let mut cfg = PipelineConfig::default();
    let err = cfg
        .apply_vars(vars(&[("THUMBFORGE_SKIP_CACHE", "maybe")]))
        .unwrap_err();
    assert!(matches!(err, ThumbError::Config(_)));

    let err = cfg
        .apply_vars(vars(&[("THUMBFORGE_MAX_ATTEMPTS", "three")]))
        .unwrap_err();
    assert!(err.to_string().contains("THUMBFORGE_MAX_ATTEMPTS"));
}

#[test]
fn validate_rejects_out_of_range_values() {
    let mut cfg = PipelineConfig::default();
    cfg.max_attempts = 4;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.max_attempts = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.fidelity_threshold = 1.5;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.mobile_width = 2000;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.timeouts.synthesis = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.safe_margins.left = 0.7;
    assert!(cfg.validate().is_err());
}

#[test]
fn derived_settings_follow_config() {
    let mut cfg = PipelineConfig::default();
    cfg.contrast_floor = 0.2;
    cfg.keep_attempt_artifacts = true;
    cfg.timeouts.vision = 5;

    let comp = cfg.compositor_settings();
    assert_eq!(comp.contrast_floor, 0.2);
    assert_eq!(comp.canvas, cfg.canvas);
    assert_eq!(comp.wrap_width, CompositorSettings::default().wrap_width);

    let orch = cfg.orchestrator_settings();
    assert!(orch.keep_attempt_artifacts);
    assert_eq!(orch.timeouts.vision, Duration::from_secs(5));
}

#[test]
fn suite_registers_four_checks_in_order() {
    let services = PipelineConfig::default().http_services().unwrap();
    let suite = PipelineConfig::default().build_suite(&services).unwrap();
    assert_eq!(
        suite.names(),
        vec![
            "text_fidelity",
            "legibility",
            "mobile_readability",
            "visual_integrity"
        ]
    );
}
