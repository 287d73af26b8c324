//! The pdfium-backed engine: one bound library serving as both the
//! [`Rasterizer`](crate::pipeline::render::Rasterizer) and the
//! [`DocumentCodec`].
//!
//! ## Library resolution
//!
//! First match wins:
//!
//! 1. an explicit path (`SplitConfig::pdfium_lib_path`, CLI `--pdfium-lib`);
//! 2. `PDFIUM_LIB_PATH`;
//! 3. a platform library in the current directory (`./libpdfium.so`, …);
//! 4. the system library search path.
//!
//! The engine is bound once per process and shared across blocking workers.
//! pdfium-render's `sync` feature makes `Pdfium` `Send + Sync`, and its
//! `thread_safe` feature serialises calls into the C library.

use crate::document::{Document, DocumentCodec, PageImage};
use crate::error::SplitError;
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A bound pdfium library plus the password used to open inputs.
pub struct PdfiumEngine {
    pdfium: Pdfium,
    password: Option<String>,
}

impl std::fmt::Debug for PdfiumEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumEngine")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl PdfiumEngine {
    /// Bind to pdfium following the resolution order in the module docs.
    pub fn bind(lib_path: Option<&Path>, password: Option<String>) -> Result<Self, SplitError> {
        let bindings = match resolve_library_path(lib_path) {
            Some(path) => {
                info!("Binding pdfium from {}", path.display());
                Pdfium::bind_to_library(&path).map_err(|e| {
                    SplitError::PdfiumBindingFailed(format!("{}: {e}", path.display()))
                })?
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| SplitError::PdfiumBindingFailed(e.to_string()))?,
        };

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            password,
        })
    }

    /// Parse `bytes` as a PDF, mapping pdfium's errors onto [`SplitError`].
    pub(crate) fn load<'a>(&'a self, bytes: &'a [u8]) -> Result<PdfDocument<'a>, SplitError> {
        let password = self.password.as_deref();
        self.pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        SplitError::WrongPassword
                    } else {
                        SplitError::PasswordRequired
                    }
                } else {
                    SplitError::CorruptPdf { detail: err_str }
                }
            })
    }

    /// Read document metadata without rendering pages.
    pub fn metadata(&self, bytes: &[u8]) -> Result<DocumentMetadata, SplitError> {
        let document = self.load(bytes)?;
        let metadata = document.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: document.pages().len() as usize,
            pdf_version: format!("{:?}", document.version()),
            byte_len: bytes.len(),
        })
    }

    fn save(document: &PdfDocument<'_>) -> Result<Vec<u8>, PdfiumError> {
        document.save_to_bytes()
    }
}

impl DocumentCodec for PdfiumEngine {
    fn open(&self, bytes: Vec<u8>) -> Result<Document, SplitError> {
        let page_count = self.load(&bytes)?.pages().len() as usize;
        info!("PDF loaded: {} pages", page_count);
        Ok(Document::new(bytes, page_count))
    }

    fn assemble(&self, pages: &[PageImage]) -> Result<Document, SplitError> {
        if pages.is_empty() {
            return Err(SplitError::EmptyDocument);
        }

        let fail = |i: usize, e: PdfiumError| {
            SplitError::ReassemblyFailed(format!("page {}: {:?}", i + 1, e))
        };

        let mut document = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| SplitError::ReassemblyFailed(format!("{:?}", e)))?;

        for (i, page_image) in pages.iter().enumerate() {
            let width = PdfPoints::new(page_image.width_pt);
            let height = PdfPoints::new(page_image.height_pt);

            let mut page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::Custom(width, height))
                .map_err(|e| fail(i, e))?;

            // Rendered bitmaps carry an opaque alpha channel; drop it so the
            // embedded image is plain RGB.
            let rgb = DynamicImage::ImageRgb8(page_image.image.to_rgb8());
            page.objects_mut()
                .create_image_object(PdfPoints::ZERO, PdfPoints::ZERO, &rgb, Some(width), Some(height))
                .map_err(|e| fail(i, e))?;

            debug!(
                "Reassembled page {} at {:.1}x{:.1} pt",
                i + 1,
                page_image.width_pt,
                page_image.height_pt
            );
        }

        let bytes = Self::save(&document)
            .map_err(|e| SplitError::ReassemblyFailed(format!("save: {:?}", e)))?;
        Ok(Document::new(bytes, pages.len()))
    }

    fn extract_pages(&self, source: &Document, pages: Range<usize>) -> Result<Document, SplitError> {
        let fail = |detail: String| SplitError::SplitFailed {
            start: pages.start + 1,
            end: pages.end,
            detail,
        };

        if pages.start >= pages.end || pages.end > source.page_count() {
            return Err(fail(format!(
                "range {}..{} outside document of {} pages",
                pages.start,
                pages.end,
                source.page_count()
            )));
        }

        let (first, last) = pdfium_index(pages.start)
            .zip(pdfium_index(pages.end - 1))
            .ok_or_else(|| fail(format!("page {} exceeds the pdfium page index range", pages.end)))?;

        let source_pdf = self.load(source.bytes())?;
        let mut target = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| fail(format!("{:?}", e)))?;

        target
            .pages_mut()
            .copy_page_range_from_document(
                &source_pdf,
                first..=last,
                0,
            )
            .map_err(|e| fail(format!("{:?}", e)))?;

        let bytes = Self::save(&target).map_err(|e| fail(format!("save: {:?}", e)))?;
        Ok(Document::new(bytes, pages.len()))
    }
}

/// 0-based index as pdfium's `u16` page index; `None` past 65535.
pub(crate) fn pdfium_index(index: usize) -> Option<PdfPageIndex> {
    PdfPageIndex::try_from(index).ok()
}

/// Explicit path, else `PDFIUM_LIB_PATH` when it points at an existing file.
fn resolve_library_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    std::env::var("PDFIUM_LIB_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_can_be_shared_across_workers() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdfiumEngine>();
        assert_send_sync::<std::sync::Arc<PdfiumEngine>>();
    }

    #[test]
    fn page_index_beyond_u16_is_rejected() {
        assert_eq!(pdfium_index(0), Some(0));
        assert_eq!(pdfium_index(65_535), Some(65_535));
        assert_eq!(pdfium_index(65_536), None);
        assert_eq!(pdfium_index(70_000), None);
    }

    #[test]
    fn explicit_path_wins() {
        let p = resolve_library_path(Some(Path::new("/opt/pdfium/libpdfium.so")));
        assert_eq!(p, Some(PathBuf::from("/opt/pdfium/libpdfium.so")));
    }
}
