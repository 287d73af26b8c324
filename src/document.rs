//! The page container and the codec seam.
//!
//! A [`Document`] is an encoded PDF plus its resolved page count. Pages are
//! addressed purely by position; there are no page IDs. The bytes are never
//! mutated in place: every stage that changes a document produces a new one,
//! so outputs of the splitter share nothing with each other or the source.

use crate::error::SplitError;
use image::DynamicImage;
use std::fmt;
use std::ops::Range;

/// An immutable, encoded, paginated document.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    bytes: Vec<u8>,
    page_count: usize,
}

impl Document {
    /// Wrap encoded bytes whose page count has already been resolved by a
    /// [`DocumentCodec`].
    pub fn new(bytes: Vec<u8>, page_count: usize) -> Self {
        Self { bytes, page_count }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Size of the encoded document in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("page_count", &self.page_count)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// One corrected raster together with the physical page size it should
/// occupy, in PDF points (1/72 inch).
#[derive(Debug, Clone)]
pub struct PageImage {
    pub image: DynamicImage,
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageImage {
    /// Size a raster rendered at `dpi` so that it keeps its physical size.
    pub fn from_raster(image: DynamicImage, dpi: u32) -> Self {
        let scale = 72.0 / dpi.max(1) as f32;
        Self {
            width_pt: image.width() as f32 * scale,
            height_pt: image.height() as f32 * scale,
            image,
        }
    }
}

/// Parses, builds and slices paginated documents.
///
/// Implementations are blocking and must be shareable across worker
/// threads.
pub trait DocumentCodec: Send + Sync {
    /// Parse encoded bytes and resolve the page count.
    fn open(&self, bytes: Vec<u8>) -> Result<Document, SplitError>;

    /// Build a new document whose page `i` shows exactly `pages[i]`.
    fn assemble(&self, pages: &[PageImage]) -> Result<Document, SplitError>;

    /// Copy pages `pages` (0-based, half-open) of `source` into a new,
    /// independent document.
    fn extract_pages(&self, source: &Document, pages: Range<usize>) -> Result<Document, SplitError>;
}
