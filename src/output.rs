//! Result types returned by the pipeline.
//!
//! Everything here is `Serialize` so the CLI can print it with `--json`.
//! Document bytes are skipped during serialisation; the HTTP service encodes
//! them separately.

use crate::document::Document;
use crate::pipeline::normalize::CorrectedPage;
use crate::pipeline::orient::{Orientation, RotationAngle};
use crate::pipeline::range::ValidRange;
use serde::Serialize;

/// Result of a normalise-and-split run.
#[derive(Debug, Clone, Serialize)]
pub struct SplitOutput {
    /// One entry per valid requested range, in request order.
    pub parts: Vec<SplitPart>,
    /// One entry per page of the source document, in page order.
    pub pages: Vec<PageOrientation>,
    pub stats: SplitStats,
}

impl SplitOutput {
    /// Output documents in request order, discarding the reporting data.
    pub fn into_documents(self) -> Vec<Document> {
        self.parts.into_iter().map(|p| p.document).collect()
    }
}

/// One output document and the range that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct SplitPart {
    /// Index of the originating entry in the request's range list.
    pub request_index: usize,
    /// The clamped range actually extracted.
    pub range: ValidRange,
    pub page_count: usize,
    #[serde(skip)]
    pub document: Document,
}

/// Orientation outcome for one source page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageOrientation {
    /// 1-indexed page number.
    pub page_num: usize,
    /// What the classifier reported.
    pub orientation: Orientation,
    /// The clockwise rotation that was applied.
    pub applied: RotationAngle,
    /// Size of the corrected raster.
    pub width_px: u32,
    pub height_px: u32,
}

impl From<&CorrectedPage> for PageOrientation {
    fn from(page: &CorrectedPage) -> Self {
        Self {
            page_num: page.index + 1,
            orientation: page.orientation,
            applied: page.applied(),
            width_px: page.image.width(),
            height_px: page.image.height(),
        }
    }
}

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitStats {
    pub total_pages: usize,
    /// Pages that received a non-zero correction.
    pub rotated_pages: usize,
    /// Pages whose orientation could not be determined.
    pub undetected_pages: usize,
    pub requested_ranges: usize,
    pub emitted_ranges: usize,
    pub skipped_ranges: usize,
    pub normalize_duration_ms: u64,
    pub split_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl SplitStats {
    /// Page counters derived from a set of orientation records.
    pub fn count_pages(pages: &[PageOrientation]) -> (usize, usize) {
        let rotated = pages.iter().filter(|p| !p.applied.is_identity()).count();
        let undetected = pages.iter().filter(|p| p.orientation.is_unknown()).count();
        (rotated, undetected)
    }
}

/// A corrected, reassembled document without any splitting.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedDocument {
    #[serde(skip)]
    pub document: Document,
    pub pages: Vec<PageOrientation>,
    pub duration_ms: u64,
}

/// Document-level metadata, read without rendering.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// Size of the encoded file.
    pub byte_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(page_num: usize, orientation: Orientation) -> PageOrientation {
        PageOrientation {
            page_num,
            orientation,
            applied: orientation.correction(),
            width_px: 10,
            height_px: 20,
        }
    }

    #[test]
    fn count_pages_separates_rotated_and_unknown() {
        let pages = vec![
            record(1, Orientation::Detected(RotationAngle::Deg0)),
            record(2, Orientation::Detected(RotationAngle::Deg90)),
            record(3, Orientation::Unknown),
            record(4, Orientation::Detected(RotationAngle::Deg180)),
        ];
        assert_eq!(SplitStats::count_pages(&pages), (2, 1));
    }

    #[test]
    fn part_serialisation_skips_bytes() {
        let part = SplitPart {
            request_index: 2,
            range: ValidRange {
                start_idx: 0,
                end_idx: 3,
            },
            page_count: 3,
            document: Document::new(b"%PDF-secret".to_vec(), 3),
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["request_index"], 2);
        assert_eq!(json["range"]["end_idx"], 3);
        assert!(json.get("document").is_none());
    }
}
