use async_trait::async_trait;
use base64::Engine as _;

use crate::foundation::core::{Background, Canvas, ServiceKind};
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::services::BackgroundSynthesizer;
use crate::services::gateway::GatewayClient;

/// Exclusions sent with every generation request.
pub const BASE_NEGATIVE_PROMPT: &str =
    "humans, people, faces, hands, characters, text, words, letters, numbers, watermarks";

/// Fixed exclusions followed by the attempt's restriction text.
pub fn negative_prompt(restriction: &str) -> String {
    let restriction = restriction.trim();
    if restriction.is_empty() {
        BASE_NEGATIVE_PROMPT.to_string()
    } else {
        format!("{BASE_NEGATIVE_PROMPT}. {restriction}")
    }
}

#[derive(serde::Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: String,
    negative_prompt: String,
    width: u32,
    height: u32,
}

#[derive(serde::Deserialize)]
struct ImageResponse {
    #[serde(default)]
    images: Vec<String>,
}

/// JSON image-generation client; the reply carries base64-encoded images.
#[derive(Clone, Debug)]
pub struct HttpSynthesizer {
    client: GatewayClient,
    canvas: Canvas,
}

impl HttpSynthesizer {
    pub fn new(client: GatewayClient, canvas: Canvas) -> Self {
        Self { client, canvas }
    }
}

#[async_trait]
impl BackgroundSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, metaphor: &str, restriction: &str) -> ThumbResult<Background> {
        let cfg = self.client.config();
        let request = ImageRequest {
            model: &cfg.image_model,
            prompt: format!("High-quality video thumbnail background: {metaphor}"),
            negative_prompt: negative_prompt(restriction),
            width: self.canvas.width,
            height: self.canvas.height,
        };
        let response: ImageResponse = self
            .client
            .post_json(
                ServiceKind::Synthesis,
                &cfg.endpoint("images/generations"),
                &request,
            )
            .await?;

        let encoded = response
            .images
            .into_iter()
            .next()
            .ok_or_else(|| ThumbError::synthesis("no image in generation response"))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| ThumbError::synthesis(format!("image payload is not base64: {e}")))?;
        Background::from_encoded(&bytes, self.canvas)
    }
}
