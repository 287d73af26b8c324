//! Fake engines for pipeline and server tests.
//!
//! A fake document is `%PDF-FAKE\n` followed by a JSON array of
//! [`FakePage`]s. The fake rasteriser paints each page in a solid colour
//! whose red channel is the page id, with one white marker pixel in the
//! top-left corner, so tests can tell from an output page which source page
//! it came from and how it was turned.

#![allow(dead_code)]

use edgequake_pdfsplit::{
    ClassifierError, Document, DocumentCodec, Orientation, OrientationClassifier, PageImage,
    Pipeline, Rasterizer, RotationAngle, SplitConfig, SplitError,
};
use image::{DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const FAKE_HEADER: &[u8] = b"%PDF-FAKE\n";
pub const MARKER: [u8; 3] = [255, 255, 255];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakePage {
    pub id: u8,
    pub width: u32,
    pub height: u32,
    /// Where the marker pixel ended up (set by the codec on assembly).
    #[serde(default)]
    pub marker: Option<(u32, u32)>,
    #[serde(default)]
    pub width_pt: Option<f32>,
    #[serde(default)]
    pub height_pt: Option<f32>,
}

impl FakePage {
    pub fn new(id: u8, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            marker: None,
            width_pt: None,
            height_pt: None,
        }
    }
}

pub fn encode_fake(pages: &[FakePage]) -> Vec<u8> {
    let mut bytes = FAKE_HEADER.to_vec();
    bytes.extend(serde_json::to_vec(pages).expect("serialise fake pages"));
    bytes
}

pub fn decode_fake(bytes: &[u8]) -> Result<Vec<FakePage>, String> {
    let body = bytes
        .strip_prefix(FAKE_HEADER)
        .ok_or_else(|| "missing fake header".to_string())?;
    serde_json::from_slice(body).map_err(|e| e.to_string())
}

/// A fake PDF with pages `1..=n`, all 40×60 px.
pub fn fake_pdf(n: u8) -> Vec<u8> {
    let pages: Vec<FakePage> = (1..=n).map(|id| FakePage::new(id, 40, 60)).collect();
    encode_fake(&pages)
}

pub fn ids(document: &Document) -> Vec<u8> {
    decode_fake(document.bytes())
        .expect("fake document")
        .iter()
        .map(|p| p.id)
        .collect()
}

pub fn paint(page: &FakePage) -> DynamicImage {
    let mut img = RgbImage::from_pixel(page.width, page.height, Rgb([page.id, 0, 0]));
    img.put_pixel(0, 0, Rgb(MARKER));
    DynamicImage::ImageRgb8(img)
}

fn page_id(image: &DynamicImage) -> u8 {
    let rgb = image.to_rgb8();
    rgb.get_pixel(rgb.width() / 2, rgb.height() / 2).0[0]
}

fn marker_position(image: &DynamicImage) -> Option<(u32, u32)> {
    image
        .to_rgb8()
        .enumerate_pixels()
        .find(|(_, _, p)| p.0 == MARKER)
        .map(|(x, y, _)| (x, y))
}

// ── Rasteriser ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FakeRasterizer {
    /// 0-based page index that fails to render.
    pub fail_on: Option<usize>,
    /// Artificial render latency for every page.
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeRasterizer {
    pub fn failing_on(index: usize) -> Self {
        Self {
            fail_on: Some(index),
            ..Self::default()
        }
    }

    pub fn slowed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

impl Rasterizer for FakeRasterizer {
    fn rasterize(
        &self,
        document: &Document,
        page_index: usize,
        _dpi: u32,
    ) -> Result<DynamicImage, SplitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_on == Some(page_index) {
            return Err(SplitError::RasterisationFailed {
                page: page_index + 1,
                detail: "fake render failure".into(),
            });
        }
        let pages = decode_fake(document.bytes()).map_err(|detail| SplitError::CorruptPdf { detail })?;
        let page = pages.get(page_index).ok_or_else(|| SplitError::RasterisationFailed {
            page: page_index + 1,
            detail: "out of range".into(),
        })?;
        Ok(paint(page))
    }
}

// ── Classifier ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum Verdict {
    Rotate(RotationAngle),
    Unknown,
    Fail,
    Panic,
}

/// Answers per page id; pages without an entry are upright.
#[derive(Debug, Default)]
pub struct FakeClassifier {
    pub verdicts: HashMap<u8, Verdict>,
    /// Per-id artificial latency, to force out-of-order completion.
    pub delays: HashMap<u8, Duration>,
    pub calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn with(verdicts: impl IntoIterator<Item = (u8, Verdict)>) -> Self {
        Self {
            verdicts: verdicts.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn delayed(mut self, delays: impl IntoIterator<Item = (u8, Duration)>) -> Self {
        self.delays = delays.into_iter().collect();
        self
    }
}

impl OrientationClassifier for FakeClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Orientation, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = page_id(image);
        if let Some(delay) = self.delays.get(&id) {
            std::thread::sleep(*delay);
        }
        match self.verdicts.get(&id).copied() {
            None => Ok(Orientation::Detected(RotationAngle::Deg0)),
            Some(Verdict::Rotate(angle)) => Ok(Orientation::Detected(angle)),
            Some(Verdict::Unknown) => Ok(Orientation::Unknown),
            Some(Verdict::Fail) => Err(ClassifierError::CommandFailed {
                status: "exit status: 1".into(),
                stderr: "Too few characters. Skipping this page".into(),
            }),
            Some(Verdict::Panic) => panic!("fake classifier crashed on page {id}"),
        }
    }
}

// ── Codec ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FakeCodec;

impl DocumentCodec for FakeCodec {
    fn open(&self, bytes: Vec<u8>) -> Result<Document, SplitError> {
        let pages = decode_fake(&bytes).map_err(|detail| SplitError::CorruptPdf { detail })?;
        Ok(Document::new(bytes, pages.len()))
    }

    fn assemble(&self, pages: &[PageImage]) -> Result<Document, SplitError> {
        let fake: Vec<FakePage> = pages
            .iter()
            .map(|p| FakePage {
                id: page_id(&p.image),
                width: p.image.width(),
                height: p.image.height(),
                marker: marker_position(&p.image),
                width_pt: Some(p.width_pt),
                height_pt: Some(p.height_pt),
            })
            .collect();
        Ok(Document::new(encode_fake(&fake), fake.len()))
    }

    fn extract_pages(&self, source: &Document, pages: Range<usize>) -> Result<Document, SplitError> {
        let all = decode_fake(source.bytes()).map_err(|detail| SplitError::CorruptPdf { detail })?;
        let slice = all.get(pages.clone()).ok_or_else(|| SplitError::SplitFailed {
            start: pages.start + 1,
            end: pages.end,
            detail: "out of range".into(),
        })?;
        Ok(Document::new(encode_fake(slice), slice.len()))
    }
}

// ── Pipeline helpers ─────────────────────────────────────────────────────────

pub fn test_config() -> SplitConfig {
    SplitConfig::builder()
        .dpi(144)
        .concurrency(4)
        .max_pages(50)
        .build()
        .expect("valid test config")
}

pub fn fake_pipeline(classifier: FakeClassifier) -> Pipeline {
    fake_pipeline_with(FakeRasterizer::default(), classifier, test_config())
}

pub fn fake_pipeline_with(
    rasterizer: FakeRasterizer,
    classifier: FakeClassifier,
    config: SplitConfig,
) -> Pipeline {
    Pipeline::new(
        Arc::new(rasterizer),
        Arc::new(classifier),
        Arc::new(FakeCodec),
        config,
    )
}
