//! Pipeline orchestration: normalise, reassemble, split.
//!
//! [`Pipeline`] owns the three engine adapters and the configuration. It is
//! cheap to clone and holds no per-request state, so the HTTP service shares
//! one instance across all requests.
//!
//! pdfium and tesseract are blocking, so every stage that touches them runs
//! on tokio's blocking pool.

use crate::config::SplitConfig;
use crate::document::{Document, DocumentCodec};
use crate::engine::PdfiumEngine;
use crate::error::SplitError;
use crate::output::{DocumentMetadata, NormalizedDocument, PageOrientation, SplitOutput, SplitStats};
use crate::pipeline::input;
use crate::pipeline::normalize::{normalize_pages, CorrectedPage};
use crate::pipeline::orient::OrientationClassifier;
use crate::pipeline::range::PageRange;
use crate::pipeline::reassemble::reassemble;
use crate::pipeline::render::Rasterizer;
use crate::pipeline::split::split;
use crate::pipeline::tesseract::TesseractClassifier;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// The normalise-and-split pipeline with its engines.
#[derive(Clone)]
pub struct Pipeline {
    rasterizer: Arc<dyn Rasterizer>,
    classifier: Arc<dyn OrientationClassifier>,
    codec: Arc<dyn DocumentCodec>,
    config: SplitConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Assemble a pipeline from explicit adapters.
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        classifier: Arc<dyn OrientationClassifier>,
        codec: Arc<dyn DocumentCodec>,
        config: SplitConfig,
    ) -> Self {
        Self {
            rasterizer,
            classifier,
            codec,
            config,
        }
    }

    /// The production pipeline: pdfium for rendering and PDF I/O, tesseract
    /// for orientation.
    pub fn with_pdfium(config: SplitConfig) -> Result<Self, SplitError> {
        let engine = PdfiumEngine::bind(config.pdfium_lib_path.as_deref(), config.password.clone())?;
        Ok(Self::with_engine(Arc::new(engine), config))
    }

    /// Like [`Pipeline::with_pdfium`] but reusing an already bound engine.
    pub fn with_engine(engine: Arc<PdfiumEngine>, config: SplitConfig) -> Self {
        let classifier = TesseractClassifier::new(config.tesseract.clone());
        Self::new(engine.clone(), Arc::new(classifier), engine, config)
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Normalise `bytes` and split the result along `ranges`.
    ///
    /// Invalid ranges are omitted from the output; they are not errors.
    pub async fn run(&self, bytes: Vec<u8>, ranges: &[PageRange]) -> Result<SplitOutput, SplitError> {
        let total_start = Instant::now();

        let normalize_start = Instant::now();
        let (corrected, pages) = self.normalize_to_document(bytes).await?;
        let normalize_duration_ms = normalize_start.elapsed().as_millis() as u64;

        let split_start = Instant::now();
        let codec = Arc::clone(&self.codec);
        let owned_ranges = ranges.to_vec();
        let parts = blocking(move || split(codec.as_ref(), &corrected, &owned_ranges)).await?;
        let split_duration_ms = split_start.elapsed().as_millis() as u64;

        let (rotated_pages, undetected_pages) = SplitStats::count_pages(&pages);
        let stats = SplitStats {
            total_pages: pages.len(),
            rotated_pages,
            undetected_pages,
            requested_ranges: ranges.len(),
            emitted_ranges: parts.len(),
            skipped_ranges: ranges.len() - parts.len(),
            normalize_duration_ms,
            split_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Split complete: {}/{} ranges emitted from {} pages ({} rotated) in {}ms",
            stats.emitted_ranges,
            stats.requested_ranges,
            stats.total_pages,
            stats.rotated_pages,
            stats.total_duration_ms
        );

        Ok(SplitOutput { parts, pages, stats })
    }

    /// Normalise `bytes` without splitting.
    pub async fn normalize(&self, bytes: Vec<u8>) -> Result<NormalizedDocument, SplitError> {
        let start = Instant::now();
        let (document, pages) = self.normalize_to_document(bytes).await?;
        Ok(NormalizedDocument {
            document,
            pages,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn normalize_to_document(
        &self,
        bytes: Vec<u8>,
    ) -> Result<(Document, Vec<PageOrientation>), SplitError> {
        input::check_size(&bytes, self.config.max_input_bytes)?;
        input::check_magic(&bytes)?;

        let codec = Arc::clone(&self.codec);
        let source = blocking(move || codec.open(bytes)).await?;

        let total_pages = source.page_count();
        if total_pages == 0 {
            return Err(SplitError::EmptyDocument);
        }
        if total_pages > self.config.max_pages {
            return Err(SplitError::TooManyPages {
                pages: total_pages,
                limit: self.config.max_pages,
            });
        }

        let corrected: Vec<CorrectedPage> = normalize_pages(
            Arc::new(source),
            Arc::clone(&self.rasterizer),
            Arc::clone(&self.classifier),
            &self.config,
        )
        .await?;
        let pages: Vec<PageOrientation> = corrected.iter().map(PageOrientation::from).collect();

        let codec = Arc::clone(&self.codec);
        let dpi = self.config.dpi;
        let document = blocking(move || reassemble(codec.as_ref(), corrected, dpi)).await?;

        Ok((document, pages))
    }

    /// Split a local file and write each part to `out_dir` as
    /// `<stem>_part<N>.pdf` (N counts emitted parts from 1).
    pub async fn split_file_to_dir(
        &self,
        input_path: &Path,
        ranges: &[PageRange],
        out_dir: &Path,
    ) -> Result<(SplitOutput, Vec<PathBuf>), SplitError> {
        let bytes = input::read_local(input_path, self.config.max_input_bytes).await?;
        let output = self.run(bytes, ranges).await?;

        let stem = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let mut written = Vec::with_capacity(output.parts.len());
        for (n, part) in output.parts.iter().enumerate() {
            let path = out_dir.join(format!("{}_part{}.pdf", stem, n + 1));
            write_atomic(&path, part.document.bytes()).await?;
            written.push(path);
        }

        Ok((output, written))
    }

    /// Normalise a local file and write the corrected document to `output_path`.
    pub async fn rotate_file(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<NormalizedDocument, SplitError> {
        let bytes = input::read_local(input_path, self.config.max_input_bytes).await?;
        let normalized = self.normalize(bytes).await?;
        write_atomic(output_path, normalized.document.bytes()).await?;
        Ok(normalized)
    }
}

/// Read metadata from a local PDF without rendering any page.
pub async fn inspect(
    engine: Arc<PdfiumEngine>,
    input_path: &Path,
    max_input_bytes: usize,
) -> Result<DocumentMetadata, SplitError> {
    let bytes = input::read_local(input_path, max_input_bytes).await?;
    blocking(move || engine.metadata(&bytes)).await
}

/// Write `bytes` to `path` via a temp file and rename, so readers never see
/// a partial file.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SplitError> {
    let write_err = |e| SplitError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T, SplitError>
where
    F: FnOnce() -> Result<T, SplitError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SplitError::Internal(format!("Blocking task panicked: {}", e)))?
}
