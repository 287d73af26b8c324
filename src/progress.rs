//! Progress-callback trait for per-page normalisation events.
//!
//! Inject an [`Arc<dyn NormalizeProgressCallback>`] via
//! [`crate::config::SplitConfigBuilder::progress_callback`] to receive events
//! as the normaliser rasterises and classifies each page. The CLI uses this
//! to drive its progress bar; the HTTP service leaves it unset.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfsplit::{NormalizeProgressCallback, Orientation, SplitConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl NormalizeProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, orientation: Orientation) {
//!         let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("page {page_num}/{total_pages}: {orientation} ({done} done)");
//!     }
//! }
//!
//! let config = SplitConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::orient::Orientation;
use std::sync::Arc;

/// Called by the normaliser as it processes each page.
///
/// Pages are processed concurrently, so `on_page_start` and
/// `on_page_complete` may be called from different threads and in any page
/// order. All methods default to no-ops.
pub trait NormalizeProgressCallback: Send + Sync {
    /// Called once, after the page count is known and before any page is
    /// rasterised.
    fn on_normalize_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page (1-indexed) is rasterised.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once a page has been classified and, if needed, rotated.
    /// `orientation` is what the classifier reported (possibly
    /// [`Orientation::Unknown`]).
    fn on_page_complete(&self, page_num: usize, total_pages: usize, orientation: Orientation) {
        let _ = (page_num, total_pages, orientation);
    }

    /// Called once after every page has been corrected.
    fn on_normalize_complete(&self, total_pages: usize, rotated_pages: usize) {
        let _ = (total_pages, rotated_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl NormalizeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SplitConfig`].
pub type ProgressCallback = Arc<dyn NormalizeProgressCallback>;
