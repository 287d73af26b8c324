//! Range splitter: one independent sub-document per valid range.
//!
//! Ranges are handled in request order. Invalid ones are dropped (with a
//! debug log) rather than failing the request; overlapping ranges each get
//! their own copy of the shared pages.

use crate::document::{Document, DocumentCodec};
use crate::error::SplitError;
use crate::output::SplitPart;
use crate::pipeline::range::{validate, PageRange, RangeCheck};
use tracing::debug;

/// Split `source` along `ranges`.
///
/// The result holds one [`SplitPart`] per valid range, in input order; each
/// part records the index of the range that produced it.
pub fn split(
    codec: &dyn DocumentCodec,
    source: &Document,
    ranges: &[PageRange],
) -> Result<Vec<SplitPart>, SplitError> {
    let total_pages = source.page_count();
    let mut parts = Vec::with_capacity(ranges.len());

    for (request_index, range) in ranges.iter().enumerate() {
        let valid = match validate(range, total_pages) {
            RangeCheck::Valid(valid) => valid,
            RangeCheck::Skip(reason) => {
                debug!(
                    "Range #{} ({}) skipped: {}",
                    request_index, range, reason
                );
                continue;
            }
        };

        let document = codec.extract_pages(source, valid.as_range())?;
        debug!(
            "Range #{} ({}) → pages {} ({} pages)",
            request_index,
            range,
            valid,
            document.page_count()
        );

        parts.push(SplitPart {
            request_index,
            range: valid,
            page_count: document.page_count(),
            document,
        });
    }

    Ok(parts)
}
