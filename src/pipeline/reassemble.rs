//! Document reassembler: corrected rasters → one paginated document.
//!
//! Page `i` of the output shows exactly raster `i`. Each page is sized from
//! its raster as `pixels × 72 / dpi` points, so upright pages keep their
//! physical size and rotated pages come out with width and height swapped.
//! Mixed page sizes are fine.

use crate::document::{Document, DocumentCodec, PageImage};
use crate::error::SplitError;
use crate::pipeline::normalize::CorrectedPage;
use tracing::info;

/// Build a document from corrected pages rendered at `dpi`.
pub fn reassemble(
    codec: &dyn DocumentCodec,
    pages: Vec<CorrectedPage>,
    dpi: u32,
) -> Result<Document, SplitError> {
    if pages.is_empty() {
        return Err(SplitError::EmptyDocument);
    }

    let images: Vec<PageImage> = pages
        .into_iter()
        .map(|page| PageImage::from_raster(page.image, dpi))
        .collect();

    let document = codec.assemble(&images)?;
    if document.page_count() != images.len() {
        return Err(SplitError::ReassemblyFailed(format!(
            "expected {} pages, codec produced {}",
            images.len(),
            document.page_count()
        )));
    }

    info!(
        "Reassembled {} pages ({} bytes)",
        document.page_count(),
        document.byte_len()
    );
    Ok(document)
}
