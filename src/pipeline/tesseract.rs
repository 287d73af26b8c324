//! Orientation detection through Tesseract's OSD mode.
//!
//! `tesseract <image> stdout --psm 0` runs orientation-and-script detection
//! only and prints a short report:
//!
//! ```text
//! Page number: 0
//! Orientation in degrees: 270
//! Rotate: 90
//! Orientation confidence: 3.21
//! Script: Latin
//! Script confidence: 1.72
//! ```
//!
//! `Rotate` is the clockwise turn that makes the page upright, which is
//! exactly [`RotationAngle`]'s convention. Each page is written to a
//! temporary PNG that is deleted as soon as the process exits.

use crate::config::TesseractConfig;
use crate::error::ClassifierError;
use crate::pipeline::orient::{Orientation, OrientationClassifier, RotationAngle};
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Command;
use tracing::debug;

static RE_ROTATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Rotate:\s*(-?\d+)\s*$").unwrap());

static RE_CONFIDENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Orientation confidence:\s*([0-9]+(?:\.[0-9]+)?)\s*$").unwrap());

/// Parsed OSD report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OsdReport {
    pub rotate: RotationAngle,
    pub confidence: Option<f32>,
}

/// Extract the `Rotate:` and `Orientation confidence:` lines from OSD output.
pub fn parse_osd(output: &str) -> Result<OsdReport, ClassifierError> {
    let degrees: i64 = RE_ROTATE
        .captures(output)
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| ClassifierError::UnparsableOutput(truncate(output, 120)))?;

    let rotate = RotationAngle::from_degrees(degrees).ok_or_else(|| {
        ClassifierError::UnparsableOutput(format!("rotation {degrees} is not a quarter turn"))
    })?;

    let confidence = RE_CONFIDENCE
        .captures(output)
        .and_then(|c| c[1].parse::<f32>().ok());

    Ok(OsdReport { rotate, confidence })
}

/// [`OrientationClassifier`] backed by the `tesseract` command-line tool.
#[derive(Debug, Clone, Default)]
pub struct TesseractClassifier {
    config: TesseractConfig,
}

impl TesseractClassifier {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }

    /// Turn a report into an orientation, applying the confidence floor.
    fn judge(&self, report: OsdReport) -> Orientation {
        match (self.config.min_confidence, report.confidence) {
            (Some(floor), Some(conf)) if conf < floor => {
                debug!(
                    "OSD confidence {:.2} below {:.2}; treating as unknown",
                    conf, floor
                );
                Orientation::Unknown
            }
            (Some(_), None) => Orientation::Unknown,
            _ => Orientation::Detected(report.rotate),
        }
    }
}

impl OrientationClassifier for TesseractClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Orientation, ClassifierError> {
        let file = tempfile::Builder::new()
            .prefix("pdfsplit-osd-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ClassifierError::ImageWrite(e.to_string()))?;

        image
            .save_with_format(file.path(), image::ImageFormat::Png)
            .map_err(|e| ClassifierError::ImageWrite(e.to_string()))?;

        let mut command = Command::new(&self.config.binary);
        command.arg(file.path()).arg("stdout").args(["--psm", "0"]);
        if let Some(ref lang) = self.config.lang {
            command.arg("-l").arg(lang);
        }

        let output = command.output().map_err(|e| ClassifierError::Spawn {
            program: self.config.binary.display().to_string(),
            detail: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(ClassifierError::CommandFailed {
                status: output.status.to_string(),
                stderr: truncate(String::from_utf8_lossy(&output.stderr).trim(), 200),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = parse_osd(&stdout)?;
        debug!(
            "OSD: rotate={} confidence={:?}",
            report.rotate, report.confidence
        );
        Ok(self.judge(report))
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}\u{2026}", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SAMPLE: &str = "Page number: 0\n\
Orientation in degrees: 270\n\
Rotate: 90\n\
Orientation confidence: 3.21\n\
Script: Latin\n\
Script confidence: 1.72\n";

    #[test]
    fn parses_rotate_and_confidence() {
        let report = parse_osd(SAMPLE).unwrap();
        assert_eq!(report.rotate, RotationAngle::Deg90);
        assert_eq!(report.confidence, Some(3.21));
    }

    #[test]
    fn parses_without_confidence() {
        let report = parse_osd("Rotate: 180\n").unwrap();
        assert_eq!(report.rotate, RotationAngle::Deg180);
        assert_eq!(report.confidence, None);
    }

    #[test]
    fn missing_rotate_line_is_an_error() {
        let err = parse_osd("Too few characters. Skipping this page\n").unwrap_err();
        assert!(matches!(err, ClassifierError::UnparsableOutput(_)));
    }

    #[test]
    fn non_quarter_turn_is_an_error() {
        assert!(parse_osd("Rotate: 45\n").is_err());
    }

    #[test]
    fn confidence_floor_degrades_to_unknown() {
        let classifier = TesseractClassifier::new(TesseractConfig {
            min_confidence: Some(5.0),
            ..TesseractConfig::default()
        });
        let report = parse_osd(SAMPLE).unwrap();
        assert_eq!(classifier.judge(report), Orientation::Unknown);

        let lenient = TesseractClassifier::new(TesseractConfig {
            min_confidence: Some(1.0),
            ..TesseractConfig::default()
        });
        assert_eq!(
            lenient.judge(report),
            Orientation::Detected(RotationAngle::Deg90)
        );
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let classifier = TesseractClassifier::new(TesseractConfig {
            binary: PathBuf::from("/definitely/not/a/tesseract"),
            ..TesseractConfig::default()
        });
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        let err = classifier.classify(&img).unwrap_err();
        assert!(matches!(err, ClassifierError::Spawn { .. }), "got {err:?}");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé\u{2026}");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
