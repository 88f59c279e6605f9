use async_trait::async_trait;

use crate::foundation::core::ServiceKind;
use crate::foundation::error::ThumbResult;
use crate::services::decomposer::{ChatRequest, ChatResponse};
use crate::services::gateway::{GatewayClient, encode_png_base64, service_error};
use crate::services::{Finding, VisionJudge};

const RESPONSE_FORMAT: &str = "Answer with JSON only: {\"findings\": [{\"category\": \"face\" | \"hand\" | \
\"printed_text\" | \"other\", \"confidence\": 0.0-1.0}]}. Use an empty list when the image is clean.";

#[derive(serde::Deserialize)]
struct FindingsReply {
    #[serde(default)]
    findings: Vec<Finding>,
}

/// Vision judge behind an OpenAI-compatible chat endpoint with image input.
#[derive(Clone, Debug)]
pub struct HttpVisionJudge {
    client: GatewayClient,
}

impl HttpVisionJudge {
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VisionJudge for HttpVisionJudge {
    async fn audit(&self, image: &image::RgbImage, instruction: &str) -> ThumbResult<Vec<Finding>> {
        let cfg = self.client.config();
        let data_url = format!("data:image/png;base64,{}", encode_png_base64(image)?);
        let content = serde_json::json!([
            { "type": "text", "text": format!("{instruction}\n{RESPONSE_FORMAT}") },
            { "type": "image_url", "image_url": { "url": data_url } },
        ]);
        let request = ChatRequest::new(&cfg.vision_model, 0.0).message("user", content);

        let response: ChatResponse = self
            .client
            .post_json(ServiceKind::Vision, &cfg.endpoint("chat/completions"), &request)
            .await?;
        let text = response
            .into_text()
            .ok_or_else(|| service_error(ServiceKind::Vision, "empty audit reply"))?;
        parse_findings(&text)
    }
}

/// Extract the findings JSON from a model reply, tolerating code fences and
/// surrounding prose.
pub fn parse_findings(reply: &str) -> ThumbResult<Vec<Finding>> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => {
            return Err(service_error(
                ServiceKind::Vision,
                format!("audit reply has no JSON object: {reply:?}"),
            ));
        }
    };
    let parsed: FindingsReply = serde_json::from_str(json).map_err(|e| {
        service_error(ServiceKind::Vision, format!("malformed audit findings: {e}"))
    })?;
    Ok(parsed
        .findings
        .into_iter()
        .map(|f| Finding {
            confidence: f.confidence.clamp(0.0, 1.0),
            ..f
        })
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/services/vision.rs"]
mod tests;
