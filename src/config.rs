//! Pipeline configuration: JSON file, then `THUMBFORGE_*` environment overrides.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::composite::compositor::CompositorSettings;
use crate::composite::layout::SafeMargins;
use crate::composite::text::{FontSource, ParleyRasterizer};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::pipeline::{MAX_ATTEMPTS, OrchestratorSettings};
use crate::services::{
    GatewayClient, GatewayConfig, HttpDecomposer, HttpOcrEngine, HttpSynthesizer, HttpVisionJudge,
    ServiceTimeouts, Services,
};
use crate::validate::{
    Legibility, MobileReadability, TextFidelity, Validator, ValidatorSuite, VisualIntegrity,
};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "THUMBFORGE";

/// Service deadlines in whole seconds, as written in config files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimeoutSecs {
    pub decomposition: u64,
    pub synthesis: u64,
    pub ocr: u64,
    pub vision: u64,
}

impl Default for TimeoutSecs {
    fn default() -> Self {
        Self {
            decomposition: 30,
            synthesis: 90,
            ocr: 30,
            vision: 45,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub canvas: Canvas,
    pub max_attempts: u32,
    pub safe_margins: SafeMargins,
    pub contrast_floor: f64,
    /// Similarity the full-size OCR must exceed.
    pub fidelity_threshold: f64,
    /// Similarity the mobile-preview OCR must exceed.
    pub mobile_threshold: f64,
    pub mobile_width: u32,
    /// A forbidden finding above this confidence fails visual integrity.
    pub vision_confidence_threshold: f64,
    pub timeouts: TimeoutSecs,
    pub gateway: GatewayConfig,
    /// Title font; a system bold sans-serif is discovered when unset.
    pub font_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub keep_attempt_artifacts: bool,
    pub redecompose_on_retry: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::THUMBNAIL,
            max_attempts: MAX_ATTEMPTS,
            safe_margins: SafeMargins::default(),
            contrast_floor: 0.15,
            fidelity_threshold: 0.5,
            mobile_threshold: 0.6,
            mobile_width: 200,
            vision_confidence_threshold: 0.5,
            timeouts: TimeoutSecs::default(),
            gateway: GatewayConfig::default(),
            font_path: None,
            output_dir: PathBuf::from("outputs"),
            keep_attempt_artifacts: false,
            redecompose_on_retry: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> ThumbResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse config '{}'", path.display()))?;
        Ok(cfg)
    }

    /// Default config, or the file at `path`, with environment overrides applied
    /// and validated.
    pub fn load(path: Option<&Path>) -> ThumbResult<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_json_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Override fields from `THUMBFORGE_*` process environment variables.
    pub fn apply_env(&mut self) -> ThumbResult<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Override fields from any variable source keyed by full variable name.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ThumbResult<()> {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));

        if let Some(v) = get("TOKEN").filter(|v| !v.trim().is_empty()) {
            self.gateway.token = Some(v.trim().to_string());
        }
        if let Some(v) = get("BASE_URL") {
            self.gateway.base_url = v;
        }
        if let Some(v) = get("CHAT_MODEL") {
            self.gateway.chat_model = v;
        }
        if let Some(v) = get("VISION_MODEL") {
            self.gateway.vision_model = v;
        }
        if let Some(v) = get("IMAGE_MODEL") {
            self.gateway.image_model = v;
        }
        if let Some(v) = get("OCR_URL") {
            self.gateway.ocr_url = v;
        }
        if let Some(v) = get("SKIP_CACHE") {
            self.gateway.skip_cache = parse_bool("SKIP_CACHE", &v)?;
        }
        if let Some(v) = get("MAX_ATTEMPTS") {
            self.max_attempts = parse_num("MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("CONTRAST_FLOOR") {
            self.contrast_floor = parse_num("CONTRAST_FLOOR", &v)?;
        }
        if let Some(v) = get("FONT_PATH") {
            self.font_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("KEEP_ATTEMPT_ARTIFACTS") {
            self.keep_attempt_artifacts = parse_bool("KEEP_ATTEMPT_ARTIFACTS", &v)?;
        }
        if let Some(v) = get("REDECOMPOSE_ON_RETRY") {
            self.redecompose_on_retry = parse_bool("REDECOMPOSE_ON_RETRY", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ThumbResult<()> {
        Canvas::new(self.canvas.width, self.canvas.height)?;
        if !(1..=MAX_ATTEMPTS).contains(&self.max_attempts) {
            return Err(ThumbError::config(format!(
                "max_attempts must be in 1..={MAX_ATTEMPTS}, got {}",
                self.max_attempts
            )));
        }
        self.safe_margins.validate()?;
        for (name, v) in [
            ("contrast_floor", self.contrast_floor),
            ("fidelity_threshold", self.fidelity_threshold),
            ("mobile_threshold", self.mobile_threshold),
            ("vision_confidence_threshold", self.vision_confidence_threshold),
        ] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(ThumbError::config(format!(
                    "{name} must be in [0, 1], got {v}"
                )));
            }
        }
        if self.mobile_width == 0 || self.mobile_width > self.canvas.width {
            return Err(ThumbError::config(format!(
                "mobile_width must be in 1..={}, got {}",
                self.canvas.width, self.mobile_width
            )));
        }
        let t = self.timeouts;
        if [t.decomposition, t.synthesis, t.ocr, t.vision].contains(&0) {
            return Err(ThumbError::config("service timeouts must be at least 1s"));
        }
        if self.gateway.base_url.trim().is_empty() {
            return Err(ThumbError::config("gateway.base_url must be set"));
        }
        Ok(())
    }

    pub fn timeouts(&self) -> ServiceTimeouts {
        ServiceTimeouts {
            decomposition: Duration::from_secs(self.timeouts.decomposition),
            synthesis: Duration::from_secs(self.timeouts.synthesis),
            ocr: Duration::from_secs(self.timeouts.ocr),
            vision: Duration::from_secs(self.timeouts.vision),
        }
    }

    pub fn compositor_settings(&self) -> CompositorSettings {
        CompositorSettings {
            canvas: self.canvas,
            margins: self.safe_margins,
            contrast_floor: self.contrast_floor,
            ..CompositorSettings::default()
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            max_attempts: self.max_attempts,
            timeouts: self.timeouts(),
            keep_attempt_artifacts: self.keep_attempt_artifacts,
            redecompose_on_retry: self.redecompose_on_retry,
        }
    }

    /// The four standard checks wired to `services`, in reporting order.
    pub fn build_suite(&self, services: &Services) -> ThumbResult<ValidatorSuite> {
        let t = self.timeouts();
        ValidatorSuite::new(vec![
            Arc::new(TextFidelity::new(
                services.ocr.clone(),
                t.ocr,
                self.fidelity_threshold,
            )) as Arc<dyn Validator>,
            Arc::new(Legibility::new(self.contrast_floor)),
            Arc::new(MobileReadability::new(
                services.ocr.clone(),
                t.ocr,
                self.mobile_width,
                self.mobile_threshold,
            )),
            Arc::new(VisualIntegrity::new(
                services.vision.clone(),
                t.vision,
                self.vision_confidence_threshold,
            )),
        ])
    }

    /// HTTP-backed services sharing one gateway client.
    pub fn http_services(&self) -> ThumbResult<Services> {
        let client = GatewayClient::new(self.gateway.clone())?;
        Ok(Services {
            decomposer: Arc::new(HttpDecomposer::new(client.clone())),
            synthesizer: Arc::new(HttpSynthesizer::new(client.clone(), self.canvas)),
            ocr: Arc::new(HttpOcrEngine::new(client.clone())),
            vision: Arc::new(HttpVisionJudge::new(client)),
        })
    }

    /// Title rasterizer for the configured (or discovered) font.
    pub fn rasterizer(&self) -> ThumbResult<ParleyRasterizer> {
        let font = FontSource::resolve(self.font_path.as_deref())?;
        ParleyRasterizer::new(font)
    }
}

fn parse_bool(name: &str, v: &str) -> ThumbResult<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ThumbError::config(format!(
            "{ENV_PREFIX}_{name}: invalid boolean '{v}'"
        ))),
    }
}

fn parse_num<T>(name: &str, v: &str) -> ThumbResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    v.trim()
        .parse::<T>()
        .map_err(|e| ThumbError::config(format!("{ENV_PREFIX}_{name}: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
