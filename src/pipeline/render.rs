//! PDF rasterisation: render one page to a `DynamicImage`.
//!
//! The [`Rasterizer`] trait is the seam the normaliser talks to; the pdfium
//! implementation below is what production uses. Rendering is CPU-bound and
//! pdfium is not async-safe, so callers run it inside
//! `tokio::task::spawn_blocking`.
//!
//! ## Why scale by DPI, not cap pixels?
//!
//! The rasters produced here *become* the output pages after correction. A
//! fixed DPI gives every page the same pixel density, which lets the
//! reassembler recover each page's physical size as `pixels × 72 / dpi`.

use crate::document::Document;
use crate::engine::{pdfium_index, PdfiumEngine};
use crate::error::SplitError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

/// Renders a single page of a document at a given resolution.
pub trait Rasterizer: Send + Sync {
    /// Rasterise page `page_index` (0-based) of `document` at `dpi`.
    ///
    /// Errors are fatal for the request: a page that cannot be rendered would
    /// leave a hole in the corrected page sequence.
    fn rasterize(
        &self,
        document: &Document,
        page_index: usize,
        dpi: u32,
    ) -> Result<DynamicImage, SplitError>;
}

impl Rasterizer for PdfiumEngine {
    fn rasterize(
        &self,
        document: &Document,
        page_index: usize,
        dpi: u32,
    ) -> Result<DynamicImage, SplitError> {
        let pdf = self.load(document.bytes())?;
        let pages = pdf.pages();
        let total_pages = pages.len() as usize;

        if page_index >= total_pages {
            return Err(SplitError::RasterisationFailed {
                page: page_index + 1,
                detail: format!("page out of range (document has {total_pages} pages)"),
            });
        }

        let index = pdfium_index(page_index).ok_or_else(|| SplitError::RasterisationFailed {
            page: page_index + 1,
            detail: "page exceeds the pdfium page index range".into(),
        })?;

        let page = pages
            .get(index)
            .map_err(|e| SplitError::RasterisationFailed {
                page: page_index + 1,
                detail: format!("{:?}", e),
            })?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .render_form_data(true);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            SplitError::RasterisationFailed {
                page: page_index + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px at {} DPI",
            page_index + 1,
            image.width(),
            image.height(),
            dpi
        );

        Ok(image)
    }
}
