//! Pipeline stages for orientation normalisation and splitting.
//!
//! Each submodule implements exactly one transformation step. External
//! engines sit behind the traits in [`render`], [`orient`] and
//! [`crate::document`], so every stage can be tested with fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──────────────────▶ reassemble ──▶ split ──▶ encode
//! (base64)   (render → orient → rotate)    (codec)        (range)   (base64)
//! ```
//!
//! 1. [`input`]: decode the payload, check size and `%PDF` magic
//! 2. [`normalize`]: per page, [`render`] a raster, ask the classifier
//!    ([`orient`], [`tesseract`]) which way is up, and rotate
//! 3. [`reassemble`]: write the corrected rasters into a new document
//! 4. [`split`]: clamp each requested [`range`] and copy its pages out
//! 5. [`encode`]: base64 the resulting documents

pub mod encode;
pub mod input;
pub mod normalize;
pub mod orient;
pub mod range;
pub mod reassemble;
pub mod render;
pub mod split;
pub mod tesseract;
