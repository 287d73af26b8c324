//! # edgequake-pdfsplit
//!
//! Straighten the pages of a PDF and split it into page ranges.
//!
//! Scanned documents often arrive with pages sideways or upside down. This
//! crate rasterises every page, asks an optical orientation classifier
//! (Tesseract OSD by default) which way is up, rotates each raster upright,
//! rebuilds the document from the corrected rasters and then cuts it into the
//! requested page ranges. It ships as a library, an HTTP service and a CLI.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (base64 or file)
//!  │
//!  ├─ 1. Input       decode, check %PDF magic and size limit
//!  ├─ 2. Normalize   per page: rasterise → classify → rotate (spawn_blocking, bounded)
//!  ├─ 3. Reassemble  corrected rasters → one new PDF, page order preserved
//!  ├─ 4. Split       clamp each range, copy its pages into an independent PDF
//!  └─ 5. Output      one document per valid range, in request order
//! ```
//!
//! Orientation detection never fails a request: a page the classifier cannot
//! read is kept as it is. Ranges that are missing a bound or empty after
//! clamping are dropped without error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfsplit::{PageRange, Pipeline, SplitConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::with_pdfium(SplitConfig::default())?;
//!     let bytes = std::fs::read("scan.pdf")?;
//!     let output = pipeline
//!         .run(bytes, &[PageRange::new(1, 3), PageRange::new(4, 10)])
//!         .await?;
//!     for part in &output.parts {
//!         println!("pages {}: {} bytes", part.range, part.document.byte_len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsplit` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Runtime requirements
//!
//! * a pdfium shared library (`PDFIUM_LIB_PATH`, the working directory, or
//!   the system library path);
//! * the `tesseract` binary with the `osd` traineddata for orientation
//!   detection.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServerConfig, SplitConfig, SplitConfigBuilder, TesseractConfig};
pub use document::{Document, DocumentCodec, PageImage};
pub use engine::PdfiumEngine;
pub use error::{ClassifierError, SplitError};
pub use output::{
    DocumentMetadata, NormalizedDocument, PageOrientation, SplitOutput, SplitPart, SplitStats,
};
pub use pipeline::orient::{Orientation, OrientationClassifier, RotationAngle, UprightClassifier};
pub use pipeline::range::{PageRange, ValidRange};
pub use pipeline::render::Rasterizer;
pub use pipeline::tesseract::TesseractClassifier;
pub use process::{inspect, Pipeline};
pub use progress::{NoopProgressCallback, NormalizeProgressCallback, ProgressCallback};
