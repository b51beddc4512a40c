//! # snapdiff
//!
//! Visual and structural diff core for screenshot regression testing.
//!
//! Given two decoded images, or two raw text buffers, the engines here
//! compute a difference artifact plus a scalar difference ratio in
//! `[0.0, 1.0]`:
//!
//! - [`PixelDiff`] paints every changed pixel of the union of the two
//!   input rectangles — red where the target got brighter, blue where
//!   it got darker.
//! - [`RectangleDiff`] boxes connected regions of change and overlays
//!   red borders on the target image.
//! - [`LineDiff`] emits a unified-style line diff with `"+ "`/`"- "`
//!   markers.
//!
//! Callers supply already-decoded pixel grids in one of five encodings
//! (see [`Image`]); this crate does not fetch, decode or persist
//! anything. Each call is self-contained: inputs are borrowed read-only,
//! results are freshly allocated, and the engines are immutable objects
//! that can be shared across threads.
//!
//! The image engines process rows in parallel bands sized to the rayon
//! pool, so a single comparison of a large screenshot uses the machine
//! (and respects container CPU quotas). Output is bit-identical for any
//! worker count.
//!
//! ## Example
//!
//! ```rust
//! use snapdiff::{
//!     Bounds, Image, LineDiff, PixelDiff, Rgba8Image, DEFAULT_BRIGHTNESS_THRESHOLD, RGBA8,
//! };
//!
//! let white = RGBA8::new(255, 255, 255, 255);
//! let black = RGBA8::new(0, 0, 0, 255);
//!
//! let baseline = Image::from(Rgba8Image::filled(Bounds::from_size(64, 64), white));
//! let target = Image::from(Rgba8Image::filled(Bounds::from_size(64, 64), black));
//!
//! let result = PixelDiff::new(DEFAULT_BRIGHTNESS_THRESHOLD).calculate(&baseline, &target);
//! assert_eq!(result.diff_amount, 1.0);
//!
//! let result = LineDiff::new()
//!     .calculate(b"<p>old</p>", b"<p>new</p>")
//!     .unwrap();
//! assert_eq!(result.diff_amount, 1.0);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]

pub mod image;
pub mod line;
mod parallel;
pub mod pixel;
pub mod rectangle;
pub mod ycbcr;

pub use crate::image::{Bounds, Image, NRgba16Image, NRgba8Image, Rgba16Image, Rgba8Image};
pub use crate::line::LineDiff;
pub use crate::pixel::PixelDiff;
pub use crate::rectangle::{Rect, RectangleDiff};
pub use crate::ycbcr::{ycbcr_to_rgba, SubsampleRatio, YCbCrImage};

// Re-export the pixel value type used at the API seam.
pub use rgb::RGBA8;

/// Default brightness threshold for [`PixelDiff`].
///
/// A pixel pair must shift total brightness by more than this fraction
/// of full scale before it is classified as added or removed.
pub const DEFAULT_BRIGHTNESS_THRESHOLD: f64 = 0.1;

/// Result of an image comparison.
#[derive(Debug, Clone)]
pub struct ImageDiffResult {
    /// The rendered difference artifact.
    pub image: Image,
    /// Fraction of difference in `[0.0, 1.0]`; the exact meaning
    /// depends on the engine.
    pub diff_amount: f64,
}

/// Result of a text comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDiffResult {
    /// The rendered difference artifact.
    pub diff: Vec<u8>,
    /// Fraction of changed lines in `[0.0, 1.0]`.
    pub diff_amount: f64,
}

/// Error from a text diff engine.
///
/// The line engine never fails; parser-backed engines report their
/// parser's failure through [`TextDiffError::Parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TextDiffError {
    /// A parser collaborator rejected the input.
    Parse(String),
}

impl std::fmt::Display for TextDiffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "parse error: {message}"),
        }
    }
}

impl std::error::Error for TextDiffError {}

/// Diff variant selector, matching the wire-level `format` field.
///
/// `"dom"` belongs to a separate HTML-tree subsystem and parses as
/// unknown here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffFormat {
    /// Per-pixel image diff.
    Pixel,
    /// Bounding-rectangle image diff.
    Rectangle,
    /// Line-level text diff.
    Line,
}

impl DiffFormat {
    /// The wire-level name of the variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pixel => "pixel",
            Self::Rectangle => "rectangle",
            Self::Line => "line",
        }
    }
}

impl std::fmt::Display for DiffFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiffFormat {
    type Err = UnknownDiffFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pixel" => Ok(Self::Pixel),
            "rectangle" => Ok(Self::Rectangle),
            "line" => Ok(Self::Line),
            other => Err(UnknownDiffFormat {
                format: other.to_owned(),
            }),
        }
    }
}

/// A `format` value naming no diff variant of this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDiffFormat {
    format: String,
}

impl UnknownDiffFormat {
    /// The rejected format string.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }
}

impl std::fmt::Display for UnknownDiffFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown diff format: {}", self.format)
    }
}

impl std::error::Error for UnknownDiffFormat {}
