use super::*;

#[tokio::test]
async fn with_timeout_maps_elapsed_deadline_to_service_timeout() {
    let slow = async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok::<_, ThumbError>(1)
    };
    let err = with_timeout(ServiceKind::Synthesis, Duration::from_millis(20), slow)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ThumbError::ServiceTimeout {
            service: ServiceKind::Synthesis,
            ..
        }
    ));
    assert_eq!(err.service(), Some(ServiceKind::Synthesis));
}

#[tokio::test]
async fn with_timeout_passes_through_results_and_errors() {
    let ok = with_timeout(ServiceKind::Ocr, Duration::from_secs(1), async { Ok(7) }).await;
    assert_eq!(ok.unwrap(), 7);

    let err = with_timeout(ServiceKind::Decomposition, Duration::from_secs(1), async {
        Err::<(), _>(ThumbError::decomposition("boom"))
    })
    .await
    .unwrap_err();
    assert!(matches!(err, ThumbError::Decomposition(_)));
}

#[test]
fn default_timeouts_per_service() {
    let t = ServiceTimeouts::default();
    assert_eq!(t.synthesis, Duration::from_secs(90));
    assert_eq!(t.vision, Duration::from_secs(45));
}

#[test]
fn spans_join_in_order() {
    let spans = vec![
        TextSpan {
            text: "AI".into(),
            confidence: Some(0.9),
        },
        TextSpan {
            text: "TAKEOVER".into(),
            confidence: None,
        },
    ];
    assert_eq!(joined_text(&spans), "AI TAKEOVER");
    assert_eq!(joined_text(&[]), "");
}

#[test]
fn negative_prompt_appends_restriction() {
    assert_eq!(negative_prompt("  "), BASE_NEGATIVE_PROMPT);
    let p = negative_prompt("Strictly NO people or faces.");
    assert!(p.starts_with(BASE_NEGATIVE_PROMPT));
    assert!(p.ends_with("Strictly NO people or faces."));
}

#[test]
fn finding_categories_deserialize() {
    let f: Vec<Finding> = serde_json::from_str(
        r#"[{"category":"printed_text","confidence":0.7},{"category":"dragon","confidence":0.2}]"#,
    )
    .unwrap();
    assert_eq!(f[0].category, FindingCategory::PrintedText);
    assert_eq!(f[1].category, FindingCategory::Other);
}

#[test]
fn gateway_endpoint_joins_cleanly() {
    let cfg = GatewayConfig {
        base_url: "http://gw/v1/".into(),
        ..GatewayConfig::default()
    };
    assert_eq!(cfg.endpoint("/chat/completions"), "http://gw/v1/chat/completions");

    let with_token = GatewayConfig {
        token: Some("secret".into()),
        ..GatewayConfig::default()
    };
    assert!(!format!("{with_token:?}").contains("secret"));
    assert!(!serde_json::to_string(&with_token).unwrap().contains("secret"));
    assert!(GatewayClient::new(with_token).is_ok());
}
