//! Orientation normaliser: rasterise, classify and straighten every page.
//!
//! Pages are independent, so they are processed concurrently on the blocking
//! pool, at most `concurrency` at a time. Completion order is arbitrary;
//! each task reports its own page index and the collector writes the result
//! into that slot. The returned sequence is therefore always in page order,
//! however the work was scheduled.
//!
//! Classifier failures never surface here (see
//! [`detect_orientation`](super::orient::detect_orientation)). A rasteriser
//! failure aborts the whole run: a missing page would shift every page after
//! it and corrupt all downstream ranges.
//!
//! Dropping the returned future (a request timeout, say) cannot stop a page
//! that is already on the blocking pool, but it raises a shared flag that
//! every in-flight page checks before rasterising and before classifying,
//! so no new tesseract process is started for an abandoned request.

use crate::config::SplitConfig;
use crate::document::Document;
use crate::error::SplitError;
use crate::pipeline::orient::{detect_orientation, Orientation, OrientationClassifier, RotationAngle};
use crate::pipeline::render::Rasterizer;
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// One page after orientation correction.
#[derive(Debug, Clone)]
pub struct CorrectedPage {
    /// 0-based position in the source document.
    pub index: usize,
    /// The upright raster.
    pub image: DynamicImage,
    /// What the classifier reported.
    pub orientation: Orientation,
}

impl CorrectedPage {
    /// The rotation that was actually applied.
    pub fn applied(&self) -> RotationAngle {
        self.orientation.correction()
    }
}

/// Raises the flag when the run ends for any reason.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Rasterise and correct every page of `document`.
///
/// Returns one [`CorrectedPage`] per source page, in page order.
pub async fn normalize_pages(
    document: Arc<Document>,
    rasterizer: Arc<dyn Rasterizer>,
    classifier: Arc<dyn OrientationClassifier>,
    config: &SplitConfig,
) -> Result<Vec<CorrectedPage>, SplitError> {
    let total_pages = document.page_count();
    if total_pages == 0 {
        return Err(SplitError::EmptyDocument);
    }

    let dpi = config.dpi;
    let callback = config.progress_callback.clone();
    if let Some(ref cb) = callback {
        cb.on_normalize_start(total_pages);
    }

    info!(
        "Normalising {} pages at {} DPI (concurrency {})",
        total_pages, dpi, config.concurrency
    );

    let cancelled = Arc::new(AtomicBool::new(false));
    let _guard = CancelOnDrop(Arc::clone(&cancelled));

    let mut results = stream::iter(0..total_pages)
        .map(|index| {
            let cancelled = Arc::clone(&cancelled);
            let document = Arc::clone(&document);
            let rasterizer = Arc::clone(&rasterizer);
            let classifier = Arc::clone(&classifier);
            let callback = callback.clone();
            async move {
                let page_num = index + 1;
                if let Some(ref cb) = callback {
                    cb.on_page_start(page_num, total_pages);
                }

                let page = tokio::task::spawn_blocking(move || {
                    correct_page(
                        document.as_ref(),
                        rasterizer.as_ref(),
                        classifier.as_ref(),
                        index,
                        dpi,
                        &cancelled,
                    )
                })
                .await
                .map_err(|e| SplitError::Internal(format!("page {page_num} worker: {e}")))??;

                if let Some(ref cb) = callback {
                    cb.on_page_complete(page_num, total_pages, page.orientation);
                }
                Ok::<_, SplitError>(page)
            }
        })
        .buffer_unordered(config.concurrency.max(1));

    let mut slots: Vec<Option<CorrectedPage>> = (0..total_pages).map(|_| None).collect();
    while let Some(result) = results.next().await {
        let page = result?;
        let index = page.index;
        slots[index] = Some(page);
    }

    let pages = slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| SplitError::Internal(format!("page {} was never produced", i + 1)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rotated = pages.iter().filter(|p| !p.applied().is_identity()).count();
    if let Some(ref cb) = callback {
        cb.on_normalize_complete(total_pages, rotated);
    }
    info!("Normalised {} pages, {} rotated", total_pages, rotated);

    Ok(pages)
}

/// Rasterise, classify and rotate a single page. Blocking.
///
/// Returns [`SplitError::Cancelled`] without further work once `cancelled`
/// is set.
pub fn correct_page(
    document: &Document,
    rasterizer: &dyn Rasterizer,
    classifier: &dyn OrientationClassifier,
    index: usize,
    dpi: u32,
    cancelled: &AtomicBool,
) -> Result<CorrectedPage, SplitError> {
    let page_num = index + 1;
    let abandoned = || cancelled.load(Ordering::SeqCst);

    if abandoned() {
        return Err(SplitError::Cancelled { page: page_num });
    }
    let raster = rasterizer.rasterize(document, index, dpi)?;
    if abandoned() {
        debug!("Page {}: request abandoned, skipping classification", page_num);
        return Err(SplitError::Cancelled { page: page_num });
    }
    let orientation = detect_orientation(classifier, &raster, page_num);
    let correction = orientation.correction();

    if !correction.is_identity() {
        debug!("Page {}: rotating {} clockwise", page_num, correction);
    }

    Ok(CorrectedPage {
        index,
        image: correction.apply(raster),
        orientation,
    })
}
