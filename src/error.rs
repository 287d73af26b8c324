//! Error types for the edgequake-pdfsplit library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SplitError`]: **Fatal**: the request cannot produce correct output
//!   (undecodable input, corrupt PDF, a page that will not rasterise). Any
//!   failure that would shift page indices aborts the whole request, because
//!   a silently missing page corrupts every range that follows it.
//!
//! * [`ClassifierError`]: **Non-fatal**: orientation detection failed for a
//!   single page. It never leaves the normaliser; the page is treated as
//!   already upright (see [`crate::pipeline::orient::detect_orientation`]).

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfsplit library.
#[derive(Debug, Error)]
pub enum SplitError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The `pdf_base64` payload is not valid base64.
    #[error("Invalid base64 document payload: {0}")]
    InvalidBase64(String),

    /// The decoded bytes do not start with the `%PDF` magic.
    #[error("Input is not a PDF document (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Decoded document exceeds the configured size limit.
    #[error("Document is {size} bytes, limit is {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was configured.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// A password was configured but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    /// The document has no pages; there is nothing to anchor the output on.
    #[error("PDF contains no pages")]
    EmptyDocument,

    /// The document has more pages than the configured limit.
    #[error("PDF has {pages} pages, limit is {limit}")]
    TooManyPages { pages: usize, limit: usize },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The rasteriser failed for a specific page (1-indexed).
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Corrected pages could not be written back into a PDF.
    #[error("Reassembly of corrected pages failed: {0}")]
    ReassemblyFailed(String),

    /// Copying a page range into a new document failed (1-indexed, inclusive).
    #[error("Extracting pages {start}-{end} failed: {detail}")]
    SplitFailed {
        start: usize,
        end: usize,
        detail: String,
    },

    /// The request exceeded its wall-clock budget.
    #[error("Processing timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The caller stopped waiting while this page was still in flight.
    #[error("Page {page}: abandoned before classification")]
    Cancelled { page: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal orientation-detection failure for a single page.
///
/// Returned by [`crate::pipeline::orient::OrientationClassifier::classify`]
/// and absorbed by the normaliser.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ClassifierError {
    /// The classifier process could not be started.
    #[error("could not start classifier '{program}': {detail}")]
    Spawn { program: String, detail: String },

    /// The classifier ran but exited unsuccessfully.
    #[error("classifier exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    /// The raster could not be handed to the classifier.
    #[error("could not write page image for classifier: {0}")]
    ImageWrite(String),

    /// The classifier output carried no usable rotation.
    #[error("unparsable classifier output: {0}")]
    UnparsableOutput(String),
}
