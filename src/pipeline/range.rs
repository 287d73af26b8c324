//! Page ranges: what callers ask for and what the splitter may act on.
//!
//! A [`PageRange`] is exactly what arrived on the wire: two optional,
//! 1-based, inclusive bounds. [`validate`] turns it into a [`ValidRange`]
//! (0-based, half-open, clamped to the document) or a [`RangeCheck::Skip`].
//!
//! Out-of-bounds ranges are clamped, not rejected: pages 1–9999 of a
//! 10-page document means pages 1–10. A range is skipped only when a bound is
//! missing or nothing remains after clamping. Skips are never errors; the
//! caller simply gets fewer documents back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A requested page range, 1-based and inclusive. Either bound may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl PageRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Read a raw JSON range entry.
    ///
    /// Bounds may be integers, integral floats (`3.0`) or numeric strings
    /// (`"3"`). Anything else, including a non-object entry, yields a missing
    /// bound and therefore a skip.
    pub fn from_json(value: &Value) -> Self {
        let bound = |key: &str| value.get(key).and_then(json_bound);
        Self {
            start: bound("start"),
            end: bound("end"),
        }
    }
}

fn json_bound(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .filter(|f| *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |b: Option<i64>| b.map_or_else(|| "?".to_string(), |v| v.to_string());
        write!(f, "{}-{}", show(self.start), show(self.end))
    }
}

impl FromStr for PageRange {
    type Err = String;

    /// Parse `"3-7"` or `"5"` (a single page).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| format!("invalid page number '{}' in range '{}'", part.trim(), s))
        };

        match s.split_once('-') {
            Some((start, end)) => Ok(Self::new(parse(start)?, parse(end)?)),
            None => {
                let page = parse(s)?;
                Ok(Self::new(page, page))
            }
        }
    }
}

/// A clamped, non-empty slice of a document: pages `start_idx..end_idx`,
/// 0-based and half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidRange {
    pub start_idx: usize,
    pub end_idx: usize,
}

impl ValidRange {
    pub fn len(&self) -> usize {
        self.end_idx - self.start_idx
    }

    pub fn is_empty(&self) -> bool {
        self.start_idx >= self.end_idx
    }

    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.start_idx..self.end_idx
    }
}

impl fmt::Display for ValidRange {
    /// 1-based inclusive, as a user would write it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_idx + 1, self.end_idx)
    }
}

/// Why a range was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `start` or `end` was absent or not a number.
    MissingBound,
    /// Nothing remains after clamping (e.g. `start > end`, or `start` past
    /// the last page).
    Empty,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBound => f.write_str("missing bound"),
            Self::Empty => f.write_str("empty after clamping"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeCheck {
    Valid(ValidRange),
    Skip(SkipReason),
}

/// Clamp `range` to a document of `total_pages` pages.
pub fn validate(range: &PageRange, total_pages: usize) -> RangeCheck {
    let (Some(start), Some(end)) = (range.start, range.end) else {
        return RangeCheck::Skip(SkipReason::MissingBound);
    };

    let total = i64::try_from(total_pages).unwrap_or(i64::MAX);
    let start_idx = start.saturating_sub(1).max(0);
    let end_idx = end.min(total);

    if start_idx >= end_idx {
        return RangeCheck::Skip(SkipReason::Empty);
    }

    // Both are within 0..=total_pages here.
    RangeCheck::Valid(ValidRange {
        start_idx: start_idx as usize,
        end_idx: end_idx as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid(start: usize, end: usize) -> RangeCheck {
        RangeCheck::Valid(ValidRange {
            start_idx: start,
            end_idx: end,
        })
    }

    #[test]
    fn in_bounds_range_is_converted() {
        assert_eq!(validate(&PageRange::new(2, 4), 5), valid(1, 4));
        assert_eq!(validate(&PageRange::new(1, 1), 5), valid(0, 1));
    }

    #[test]
    fn end_is_clamped_to_document() {
        assert_eq!(validate(&PageRange::new(1, 10000), 4), valid(0, 4));
    }

    #[test]
    fn non_positive_start_is_clamped() {
        assert_eq!(validate(&PageRange::new(0, 2), 5), valid(0, 2));
        assert_eq!(validate(&PageRange::new(-7, 2), 5), valid(0, 2));
    }

    #[test]
    fn reversed_range_is_skipped() {
        assert_eq!(
            validate(&PageRange::new(5, 3), 10),
            RangeCheck::Skip(SkipReason::Empty)
        );
    }

    #[test]
    fn start_past_end_of_document_is_skipped() {
        assert_eq!(
            validate(&PageRange::new(6, 9), 5),
            RangeCheck::Skip(SkipReason::Empty)
        );
    }

    #[test]
    fn end_before_first_page_is_skipped() {
        assert_eq!(
            validate(&PageRange::new(1, 0), 5),
            RangeCheck::Skip(SkipReason::Empty)
        );
    }

    #[test]
    fn absent_bound_is_skipped() {
        let r = PageRange {
            start: Some(1),
            end: None,
        };
        assert_eq!(validate(&r, 5), RangeCheck::Skip(SkipReason::MissingBound));
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        assert_eq!(validate(&PageRange::new(i64::MIN, i64::MAX), 3), valid(0, 3));
    }

    #[test]
    fn json_bounds_are_lenient() {
        assert_eq!(
            PageRange::from_json(&json!({"start": 1, "end": 3})),
            PageRange::new(1, 3)
        );
        assert_eq!(
            PageRange::from_json(&json!({"start": "2", "end": 4.0})),
            PageRange::new(2, 4)
        );
        let r = PageRange::from_json(&json!({"start": 1.5, "end": true}));
        assert_eq!(r.start, None);
        assert_eq!(r.end, None);
        assert_eq!(PageRange::from_json(&json!([1, 2])), PageRange::default());
        assert_eq!(PageRange::from_json(&json!({"start": 1})).end, None);
    }

    #[test]
    fn parses_cli_syntax() {
        assert_eq!("3-7".parse::<PageRange>().unwrap(), PageRange::new(3, 7));
        assert_eq!(" 5 ".parse::<PageRange>().unwrap(), PageRange::new(5, 5));
        assert!("a-b".parse::<PageRange>().is_err());
        assert!("".parse::<PageRange>().is_err());
    }

    #[test]
    fn display_is_one_based() {
        let r = ValidRange {
            start_idx: 0,
            end_idx: 3,
        };
        assert_eq!(r.to_string(), "1-3");
        assert_eq!(r.len(), 3);
        assert_eq!(PageRange::new(2, 9).to_string(), "2-9");
    }
}
