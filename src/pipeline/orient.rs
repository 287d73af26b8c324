//! Page orientation: the classifier seam and the correction it drives.
//!
//! A classifier answers one question per raster: how many degrees clockwise
//! must this page turn to be upright? The answer is an [`Orientation`], which
//! is either a detected [`RotationAngle`] or [`Orientation::Unknown`].
//!
//! Classifier failure is part of the normal flow, not an error path: an
//! OCR engine that finds too little text, crashes or prints nonsense must
//! never fail the request. [`detect_orientation`] is the one place where
//! errors (and panics) from a classifier are folded into
//! [`Orientation::Unknown`], and [`Orientation::correction`] is the one place
//! where `Unknown` becomes "no rotation".

use crate::error::ClassifierError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// Clockwise rotation, in quarter turns, that makes a page upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum RotationAngle {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl RotationAngle {
    /// Map a degree value onto a quarter turn. Values are normalised modulo
    /// 360, so `-90` and `450` are accepted. Anything that is not a multiple
    /// of 90 returns `None`.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Degrees in `{0, 90, 180, 270}`.
    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn is_identity(self) -> bool {
        self == Self::Deg0
    }

    /// Turn `image` clockwise by this angle.
    ///
    /// Quarter turns are lossless pixel permutations; for 90° and 270° the
    /// output frame is the input frame with width and height swapped, so
    /// nothing is cropped.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::Deg0 => image,
            Self::Deg90 => image.rotate90(),
            Self::Deg180 => image.rotate180(),
            Self::Deg270 => image.rotate270(),
        }
    }
}

impl From<RotationAngle> for u16 {
    fn from(angle: RotationAngle) -> Self {
        angle.degrees()
    }
}

impl TryFrom<u16> for RotationAngle {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(format!("{other} is not one of 0, 90, 180, 270")),
        }
    }
}

impl fmt::Display for RotationAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// What a classifier reported for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// The classifier is confident about the needed correction.
    Detected(RotationAngle),
    /// No usable answer: too little text, low confidence, or a failure.
    Unknown,
}

impl Orientation {
    /// The rotation the normaliser applies. `Unknown` means "assume upright".
    pub fn correction(self) -> RotationAngle {
        match self {
            Self::Detected(angle) => angle,
            Self::Unknown => RotationAngle::Deg0,
        }
    }

    pub fn is_unknown(self) -> bool {
        self == Self::Unknown
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detected(angle) => write!(f, "{angle}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Optical text-orientation detector.
///
/// Implementations are blocking; the normaliser calls them from
/// `spawn_blocking` workers, several at a time, hence `Send + Sync`.
pub trait OrientationClassifier: Send + Sync {
    /// Inspect one page raster.
    ///
    /// Return `Ok(Orientation::Unknown)` when the engine ran but could not
    /// decide, and `Err` when the engine itself failed. Both end up as "no
    /// correction"; the distinction only matters for logging.
    fn classify(&self, image: &DynamicImage) -> Result<Orientation, ClassifierError>;
}

/// A classifier that always reports upright pages.
///
/// Useful for documents known to be correctly oriented, where the
/// normaliser should only re-rasterise.
#[derive(Debug, Clone, Copy, Default)]
pub struct UprightClassifier;

impl OrientationClassifier for UprightClassifier {
    fn classify(&self, _image: &DynamicImage) -> Result<Orientation, ClassifierError> {
        Ok(Orientation::Detected(RotationAngle::Deg0))
    }
}

/// Run `classifier` on page `page_num` (1-indexed), folding every failure
/// into [`Orientation::Unknown`].
pub fn detect_orientation(
    classifier: &dyn OrientationClassifier,
    image: &DynamicImage,
    page_num: usize,
) -> Orientation {
    match catch_unwind(AssertUnwindSafe(|| classifier.classify(image))) {
        Ok(Ok(orientation)) => {
            debug!("Page {}: orientation {}", page_num, orientation);
            orientation
        }
        Ok(Err(e)) => {
            warn!(
                "Page {}: orientation detection failed, assuming upright: {}",
                page_num, e
            );
            Orientation::Unknown
        }
        Err(_) => {
            warn!(
                "Page {}: orientation classifier panicked, assuming upright",
                page_num
            );
            Orientation::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// 3×2 image with a white marker in the top-left corner.
    fn marked() -> DynamicImage {
        let mut img = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([255, 255, 255]));
        DynamicImage::ImageRgb8(img)
    }

    fn marker_at(img: &DynamicImage) -> (u32, u32) {
        let rgb = img.to_rgb8();
        let (x, y, _) = rgb
            .enumerate_pixels()
            .find(|(_, _, p)| p.0 == [255, 255, 255])
            .expect("marker present");
        (x, y)
    }

    struct Failing;

    impl OrientationClassifier for Failing {
        fn classify(&self, _image: &DynamicImage) -> Result<Orientation, ClassifierError> {
            Err(ClassifierError::UnparsableOutput("garbage".into()))
        }
    }

    struct Panicking;

    impl OrientationClassifier for Panicking {
        fn classify(&self, _image: &DynamicImage) -> Result<Orientation, ClassifierError> {
            panic!("engine crashed")
        }
    }

    #[test]
    fn from_degrees_normalises() {
        assert_eq!(RotationAngle::from_degrees(0), Some(RotationAngle::Deg0));
        assert_eq!(RotationAngle::from_degrees(90), Some(RotationAngle::Deg90));
        assert_eq!(RotationAngle::from_degrees(-90), Some(RotationAngle::Deg270));
        assert_eq!(RotationAngle::from_degrees(450), Some(RotationAngle::Deg90));
        assert_eq!(RotationAngle::from_degrees(45), None);
    }

    #[test]
    fn quarter_turns_expand_the_frame() {
        let rotated = RotationAngle::Deg90.apply(marked());
        assert_eq!((rotated.width(), rotated.height()), (2, 3));
        let rotated = RotationAngle::Deg180.apply(marked());
        assert_eq!((rotated.width(), rotated.height()), (3, 2));
        let rotated = RotationAngle::Deg270.apply(marked());
        assert_eq!((rotated.width(), rotated.height()), (2, 3));
    }

    #[test]
    fn rotation_is_clockwise() {
        // Clockwise quarter turn moves the top-left corner to the top-right.
        assert_eq!(marker_at(&RotationAngle::Deg90.apply(marked())), (1, 0));
        assert_eq!(marker_at(&RotationAngle::Deg180.apply(marked())), (2, 1));
        assert_eq!(marker_at(&RotationAngle::Deg270.apply(marked())), (0, 2));
    }

    #[test]
    fn identity_leaves_pixels_untouched() {
        let original = marked();
        let out = RotationAngle::Deg0.apply(original.clone());
        assert_eq!(out.to_rgb8().into_raw(), original.to_rgb8().into_raw());
    }

    #[test]
    fn unknown_means_no_correction() {
        assert_eq!(Orientation::Unknown.correction(), RotationAngle::Deg0);
        assert_eq!(
            Orientation::Detected(RotationAngle::Deg180).correction(),
            RotationAngle::Deg180
        );
    }

    #[test]
    fn classifier_error_degrades_to_unknown() {
        assert_eq!(detect_orientation(&Failing, &marked(), 1), Orientation::Unknown);
    }

    #[test]
    fn classifier_panic_degrades_to_unknown() {
        assert_eq!(detect_orientation(&Panicking, &marked(), 2), Orientation::Unknown);
    }

    #[test]
    fn upright_classifier_reports_zero() {
        assert_eq!(
            detect_orientation(&UprightClassifier, &marked(), 1),
            Orientation::Detected(RotationAngle::Deg0)
        );
    }

    #[test]
    fn serde_uses_plain_degrees() {
        let json = serde_json::to_string(&Orientation::Detected(RotationAngle::Deg270)).unwrap();
        assert_eq!(json, r#"{"detected":270}"#);
        let json = serde_json::to_string(&Orientation::Unknown).unwrap();
        assert_eq!(json, r#""unknown""#);
        let back: RotationAngle = serde_json::from_str("90").unwrap();
        assert_eq!(back, RotationAngle::Deg90);
    }
}
