//! Persisted artifacts: rolling background/thumbnail, fallback, validator
//! intermediates and the attempt log. Each is overwritten per run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::pipeline::record::{ArtifactRef, AttemptRecord};

/// Solid color of the fallback canvas.
pub const FALLBACK_RGB: [u8; 3] = [45, 45, 55];

/// Fallback image; built locally, never fails.
pub fn fallback_image(canvas: Canvas) -> image::RgbImage {
    image::RgbImage::from_pixel(canvas.width, canvas.height, image::Rgb(FALLBACK_RGB))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Background,
    Thumbnail,
    Fallback,
    AttemptBackground(u32),
    AttemptThumbnail(u32),
    /// Validator intermediate such as the OCR mask.
    Intermediate(String),
}

impl ArtifactKind {
    pub fn file_name(&self) -> String {
        match self {
            Self::Background => "background.png".to_string(),
            Self::Thumbnail => "thumbnail.png".to_string(),
            Self::Fallback => "fallback.png".to_string(),
            Self::AttemptBackground(n) => format!("attempt_{n}_bg.png"),
            Self::AttemptThumbnail(n) => format!("attempt_{n}_thumb.png"),
            Self::Intermediate(name) => format!("{name}.png"),
        }
    }
}

pub const LOG_FILE_NAME: &str = "attempts.json";

/// Directory-safe name for a topic: lowercase alphanumerics joined by `_`.
pub fn topic_slug(topic: &str) -> String {
    let s = topic
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if s.is_empty() { "topic".to_string() } else { s }
}

/// Hands out one output directory per topic under a shared root.
///
/// Topics that slug to the same name get `_2`, `_3`, ... suffixes so no two
/// runs in a batch share artifacts.
#[derive(Clone, Debug)]
pub struct BatchDirs {
    root: PathBuf,
    taken: BTreeSet<String>,
}

impl BatchDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            taken: BTreeSet::new(),
        }
    }

    pub fn allocate(&mut self, topic: &str) -> PathBuf {
        let base = topic_slug(topic);
        let mut name = base.clone();
        let mut n = 1u32;
        while !self.taken.insert(name.clone()) {
            n += 1;
            name = format!("{base}_{n}");
        }
        self.root.join(name)
    }
}

/// Injected storage handle. Only the orchestrator writes through it.
pub trait ArtifactStore: Send + Sync {
    fn put_image(&self, kind: &ArtifactKind, image: &image::RgbImage) -> ThumbResult<ArtifactRef>;

    fn put_log(&self, records: &[AttemptRecord]) -> ThumbResult<ArtifactRef>;

    fn load_image(&self, reference: &ArtifactRef) -> ThumbResult<image::RgbImage>;
}

/// PNG files plus `attempts.json` under one directory.
#[derive(Clone, Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> ThumbResult<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("create output dir '{}'", self.root.display()))
            .map_err(storage_error)
    }
}

fn storage_error(e: anyhow::Error) -> ThumbError {
    ThumbError::storage(format!("{e:#}"))
}

impl ArtifactStore for FsArtifactStore {
    fn put_image(&self, kind: &ArtifactKind, image: &image::RgbImage) -> ThumbResult<ArtifactRef> {
        self.ensure_root()?;
        let path = self.root.join(kind.file_name());
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("write '{}'", path.display()))
            .map_err(storage_error)?;
        Ok(ArtifactRef::Path(path))
    }

    fn put_log(&self, records: &[AttemptRecord]) -> ThumbResult<ArtifactRef> {
        self.ensure_root()?;
        let path = self.root.join(LOG_FILE_NAME);
        let json = serde_json::to_vec_pretty(records)
            .context("serialize attempt log")
            .map_err(storage_error)?;
        std::fs::write(&path, json)
            .with_context(|| format!("write '{}'", path.display()))
            .map_err(storage_error)?;
        Ok(ArtifactRef::Path(path))
    }

    fn load_image(&self, reference: &ArtifactRef) -> ThumbResult<image::RgbImage> {
        match reference {
            ArtifactRef::Path(path) => Ok(image::open(path)
                .with_context(|| format!("read '{}'", path.display()))
                .map_err(storage_error)?
                .to_rgb8()),
            ArtifactRef::Memory(name) => Err(ThumbError::storage(format!(
                "artifact '{name}' was never written to disk"
            ))),
        }
    }
}

/// Keeps everything in memory; for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    images: Mutex<BTreeMap<String, Arc<image::RgbImage>>>,
    log: Mutex<Option<String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self, kind: &ArtifactKind) -> Option<Arc<image::RgbImage>> {
        self.images.lock().ok()?.get(&kind.file_name()).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.images
            .lock()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Last attempt log written, as JSON.
    pub fn log_json(&self) -> Option<String> {
        self.log.lock().ok()?.clone()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> ThumbError {
    ThumbError::storage("memory store lock poisoned")
}

impl ArtifactStore for MemoryArtifactStore {
    fn put_image(&self, kind: &ArtifactKind, image: &image::RgbImage) -> ThumbResult<ArtifactRef> {
        let name = kind.file_name();
        self.images
            .lock()
            .map_err(poisoned)?
            .insert(name.clone(), Arc::new(image.clone()));
        Ok(ArtifactRef::Memory(name))
    }

    fn put_log(&self, records: &[AttemptRecord]) -> ThumbResult<ArtifactRef> {
        let json = serde_json::to_string_pretty(records)
            .context("serialize attempt log")
            .map_err(storage_error)?;
        *self.log.lock().map_err(poisoned)? = Some(json);
        Ok(ArtifactRef::Memory(LOG_FILE_NAME.to_string()))
    }

    fn load_image(&self, reference: &ArtifactRef) -> ThumbResult<image::RgbImage> {
        let ArtifactRef::Memory(name) = reference else {
            return Err(ThumbError::storage(format!(
                "memory store cannot load {reference}"
            )));
        };
        self.images
            .lock()
            .map_err(poisoned)?
            .get(name)
            .map(|img| img.as_ref().clone())
            .ok_or_else(|| ThumbError::storage(format!("no artifact named '{name}'")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/storage.rs"]
mod tests;
