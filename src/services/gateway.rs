use std::io::Cursor;
use std::time::Instant;

use anyhow::Context;
use base64::Engine as _;
use reqwest::header;

use crate::foundation::core::ServiceKind;
use crate::foundation::error::{ThumbError, ThumbResult};

/// Connection settings for the model gateway.
///
/// `token` is never read from or written to config files; it only comes from
/// the environment.
#[derive(Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    #[serde(skip)]
    pub token: Option<String>,
    pub chat_model: String,
    pub vision_model: String,
    pub image_model: String,
    /// Full URL of the OCR endpoint.
    pub ocr_url: String,
    /// Send `X-Skip-Cache: true` so retries get fresh generations.
    pub skip_cache: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            token: None,
            chat_model: "gpt-4o-mini".to_string(),
            vision_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            ocr_url: "http://localhost:8090/ocr".to_string(),
            skip_cache: true,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("chat_model", &self.chat_model)
            .field("vision_model", &self.vision_model)
            .field("image_model", &self.image_model)
            .field("ocr_url", &self.ocr_url)
            .field("skip_cache", &self.skip_cache)
            .finish()
    }
}

impl GatewayConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Shared HTTP plumbing: one connection pool, auth and cache headers, JSON bodies.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> ThumbResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(concat!("thumbforge/", env!("CARGO_PKG_VERSION")))
                .map_err(|e| ThumbError::config(format!("invalid user agent: {e}")))?,
        );
        if let Some(token) = &config.token {
            let mut v = header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ThumbError::config("gateway token contains invalid header characters"))?;
            v.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, v);
        }
        if config.skip_cache {
            headers.insert(
                header::HeaderName::from_static("x-skip-cache"),
                header::HeaderValue::from_static("true"),
            );
        }

        // Deadlines are enforced per call by the pipeline, not by the client.
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ThumbError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// POST `body` as JSON to `url` and decode a JSON reply.
    pub async fn post_json<T, R>(&self, service: ServiceKind, url: &str, body: &T) -> ThumbResult<R>
    where
        T: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let started = Instant::now();
        tracing::debug!(%service, url, "gateway request");

        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| service_error(service, format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(service_error(
                service,
                format!("{url} returned {status}: {}", truncate(&text, 300)),
            ));
        }

        let parsed = response
            .json::<R>()
            .await
            .map_err(|e| service_error(service, format!("malformed response from {url}: {e}")))?;
        tracing::debug!(
            %service,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gateway response"
        );
        Ok(parsed)
    }
}

/// Map a boundary failure onto the error variant for that boundary.
pub(crate) fn service_error(service: ServiceKind, msg: impl Into<String>) -> ThumbError {
    let msg = msg.into();
    match service {
        ServiceKind::Decomposition => ThumbError::decomposition(msg),
        ServiceKind::Synthesis => ThumbError::synthesis(msg),
        ServiceKind::Ocr | ServiceKind::Vision => {
            ThumbError::Other(anyhow::anyhow!("{service} service error: {msg}"))
        }
    }
}

/// PNG-encode and base64 an image for JSON transport.
pub(crate) fn encode_png_base64(img: &image::RgbImage) -> ThumbResult<String> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .context("encode image as PNG")?;
    Ok(base64::engine::general_purpose::STANDARD.encode(buf.into_inner()))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
