use async_trait::async_trait;

use crate::foundation::core::ServiceKind;
use crate::foundation::error::ThumbResult;
use crate::services::gateway::{GatewayClient, encode_png_base64};
use crate::services::{OcrEngine, TextSpan};

#[derive(serde::Serialize)]
struct OcrRequest {
    image: String,
}

#[derive(serde::Deserialize)]
struct OcrResponse {
    #[serde(default)]
    spans: Vec<TextSpan>,
}

/// OCR over HTTP: PNG in, recognized spans out.
#[derive(Clone, Debug)]
pub struct HttpOcrEngine {
    client: GatewayClient,
}

impl HttpOcrEngine {
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OcrEngine for HttpOcrEngine {
    async fn recognize(&self, image: &image::RgbImage) -> ThumbResult<Vec<TextSpan>> {
        let request = OcrRequest {
            image: encode_png_base64(image)?,
        };
        let url = self.client.config().ocr_url.clone();
        let response: OcrResponse = self
            .client
            .post_json(ServiceKind::Ocr, &url, &request)
            .await?;
        Ok(response.spans)
    }
}
