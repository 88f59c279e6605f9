#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thumbforge::{
    Background, BackgroundSynthesizer, Canvas, Compositor, CompositorSettings, Decomposer,
    Decomposition, Finding, FindingCategory, GlyphMask, OcrEngine, PipelineConfig, Services,
    TextSpan, ThumbError, ThumbResult, TitleRasterizer, ValidatorSuite, VisionJudge,
};

/// Draws every non-space character as a filled block; deterministic and font-free.
#[derive(Debug)]
pub struct BlockRasterizer;

impl TitleRasterizer for BlockRasterizer {
    fn rasterize(&self, lines: &[String], size_px: f32) -> ThumbResult<GlyphMask> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ThumbError::composition("bad size"));
        }
        let cell_w = ((size_px * 0.6).round() as u32).max(2);
        let cell_h = ((size_px * 1.2).round() as u32).max(2);
        let cols = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
        let (w, h) = (cols * cell_w, lines.len() as u32 * cell_h);
        let mut coverage = vec![0u8; (w * h) as usize];
        for (row, line) in lines.iter().enumerate() {
            let offset = (cols - line.chars().count() as u32) * cell_w / 2;
            for (col, ch) in line.chars().enumerate() {
                if ch == ' ' {
                    continue;
                }
                let x0 = offset + col as u32 * cell_w + cell_w / 5;
                let y0 = row as u32 * cell_h + cell_h / 5;
                for y in y0..(row as u32 + 1) * cell_h - cell_h / 5 {
                    for x in x0..offset + (col as u32 + 1) * cell_w - cell_w / 5 {
                        coverage[(y * w + x) as usize] = 255;
                    }
                }
            }
        }
        GlyphMask::new(w, h, coverage)
    }
}

pub fn block_compositor() -> Arc<Compositor> {
    Arc::new(Compositor::new(
        CompositorSettings::default(),
        Arc::new(BlockRasterizer),
    ))
}

/// Always answers with the same plan; records every restriction it was sent.
pub struct FixedDecomposer {
    pub plan: Decomposition,
    pub restrictions: Mutex<Vec<String>>,
}

impl FixedDecomposer {
    pub fn new(title: &str, metaphor: &str) -> Self {
        Self {
            plan: Decomposition {
                metaphor: metaphor.to_string(),
                title: title.to_string(),
            },
            restrictions: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.restrictions.lock().unwrap().len()
    }
}

#[async_trait]
impl Decomposer for FixedDecomposer {
    async fn decompose(&self, _topic: &str, restriction: &str) -> ThumbResult<Decomposition> {
        self.restrictions.lock().unwrap().push(restriction.to_string());
        Ok(self.plan.clone())
    }
}

/// What the synthesizer does on a given call.
#[derive(Clone, Debug)]
pub enum SynthStep {
    Solid([u8; 3]),
    Hang,
    Fail(&'static str),
}

/// Plays `script` in order, repeating the last step once it runs out.
pub struct ScriptedSynthesizer {
    script: Vec<SynthStep>,
    pub restrictions: Mutex<Vec<String>>,
}

impl ScriptedSynthesizer {
    pub fn new(script: Vec<SynthStep>) -> Self {
        Self {
            script,
            restrictions: Mutex::new(Vec::new()),
        }
    }

    pub fn restrictions(&self) -> Vec<String> {
        self.restrictions.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackgroundSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, _metaphor: &str, restriction: &str) -> ThumbResult<Background> {
        let call = {
            let mut seen = self.restrictions.lock().unwrap();
            seen.push(restriction.to_string());
            seen.len() - 1
        };
        let step = self
            .script
            .get(call)
            .or(self.script.last())
            .cloned()
            .unwrap_or(SynthStep::Solid([40, 40, 60]));
        match step {
            SynthStep::Solid(rgb) => Ok(Background::solid(Canvas::THUMBNAIL, rgb)),
            SynthStep::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Background::solid(Canvas::THUMBNAIL, [0, 0, 0]))
            }
            SynthStep::Fail(msg) => Err(ThumbError::synthesis(msg)),
        }
    }
}

/// Reports the same recognized text for every image.
pub struct FixedOcr(pub &'static str);

#[async_trait]
impl OcrEngine for FixedOcr {
    async fn recognize(&self, _image: &image::RgbImage) -> ThumbResult<Vec<TextSpan>> {
        Ok(self
            .0
            .split_whitespace()
            .map(|w| TextSpan {
                text: w.to_string(),
                confidence: Some(0.95),
            })
            .collect())
    }
}

/// Reports a face on the listed (0-based) calls and nothing otherwise.
pub struct FaceOnCalls {
    faces_on: Vec<usize>,
    calls: Mutex<usize>,
}

impl FaceOnCalls {
    pub fn new(faces_on: &[usize]) -> Self {
        Self {
            faces_on: faces_on.to_vec(),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl VisionJudge for FaceOnCalls {
    async fn audit(&self, _image: &image::RgbImage, _instruction: &str) -> ThumbResult<Vec<Finding>> {
        let call = {
            let mut n = self.calls.lock().unwrap();
            *n += 1;
            *n - 1
        };
        if self.faces_on.contains(&call) {
            Ok(vec![Finding {
                category: FindingCategory::Face,
                confidence: 0.92,
            }])
        } else {
            Ok(Vec::new())
        }
    }
}

pub struct Fakes {
    pub decomposer: Arc<FixedDecomposer>,
    pub synthesizer: Arc<ScriptedSynthesizer>,
    pub ocr: Arc<FixedOcr>,
    pub judge: Arc<FaceOnCalls>,
}

impl Fakes {
    pub fn new(
        title: &str,
        synth: Vec<SynthStep>,
        ocr_text: &'static str,
        faces_on: &[usize],
    ) -> Self {
        Self {
            decomposer: Arc::new(FixedDecomposer::new(
                title,
                "a glowing horizon over a calm dark sea",
            )),
            synthesizer: Arc::new(ScriptedSynthesizer::new(synth)),
            ocr: Arc::new(FixedOcr(ocr_text)),
            judge: Arc::new(FaceOnCalls::new(faces_on)),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            decomposer: self.decomposer.clone(),
            synthesizer: self.synthesizer.clone(),
            ocr: self.ocr.clone(),
            vision: self.judge.clone(),
        }
    }

    /// The standard four checks with default thresholds, wired to these fakes.
    pub fn suite(&self) -> ValidatorSuite {
        PipelineConfig::default()
            .build_suite(&self.services())
            .unwrap()
    }
}
