/// Image comparison boundary
///
/// The pixel algorithm lives behind [`DiffEngine`]; the service only sees
/// two byte buffers in and a rendered PNG plus a [`DiffReport`] out.
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod pixel;

pub use pixel::PixelDiffEngine;

/// Errors that can occur during image comparison
#[derive(Debug, Error)]
pub enum DiffError {
    /// Input bytes are not a decodable image
    #[error("Failed to decode {which} image: {reason}")]
    Decode {
        /// Which input failed (`first` or `second`)
        which: &'static str,
        /// Decoder message
        reason: String,
    },

    /// Rendering the diff image failed
    #[error("Failed to render diff image: {0}")]
    Render(String),
}

/// RGB color used by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const MAGENTA: Color = Color {
        red: 255,
        green: 0,
        blue: 255,
    };

    pub const WHITE: Color = Color {
        red: 255,
        green: 255,
        blue: 255,
    };
}

/// How mismatching pixels are painted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorType {
    /// Solid error color
    Flat,
    /// Error color blended with the second image's pixel
    Movement,
}

/// Per-channel tolerances used when deciding if two pixels match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
    pub min_brightness: f64,
    pub max_brightness: f64,
}

impl Tolerance {
    /// Tolerance used when nothing is ignored
    pub const DEFAULT: Tolerance = Tolerance {
        red: 16.0,
        green: 16.0,
        blue: 16.0,
        alpha: 16.0,
        min_brightness: 16.0,
        max_brightness: 240.0,
    };

    /// Looser tolerance used when antialiasing is ignored
    pub const ANTIALIASING: Tolerance = Tolerance {
        red: 32.0,
        green: 32.0,
        blue: 32.0,
        alpha: 32.0,
        min_brightness: 64.0,
        max_brightness: 96.0,
    };
}

/// Rendering options for the diff image
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    pub error_color: Color,
    /// Pixels of this color in the first image are never counted as mismatches
    pub ignore_areas_colored_with: Option<Color>,
    pub error_type: ErrorType,
    /// Alpha multiplier applied to matching pixels (0.0..=1.0)
    pub transparency: f64,
    /// Above this many pixels on a side, only a sample of pixels is compared (0 disables)
    pub large_image_threshold: u32,
    /// Render a diff image, not just a score
    pub output_diff: bool,
}

/// Full comparison configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOptions {
    pub output: OutputOptions,
    /// Resize the second image to the first's dimensions before comparing
    pub scale_to_same_size: bool,
    pub ignore_antialiasing: bool,
}

impl Default for DiffOptions {
    /// The fixed configuration every comparison uses
    fn default() -> Self {
        Self {
            output: OutputOptions {
                error_color: Color::MAGENTA,
                ignore_areas_colored_with: Some(Color::WHITE),
                error_type: ErrorType::Movement,
                transparency: 0.6,
                large_image_threshold: 5000,
                output_diff: true,
            },
            scale_to_same_size: true,
            ignore_antialiasing: true,
        }
    }
}

impl DiffOptions {
    pub fn tolerance(&self) -> Tolerance {
        if self.ignore_antialiasing {
            Tolerance::ANTIALIASING
        } else {
            Tolerance::DEFAULT
        }
    }
}

/// Signed size difference between the two inputs (first minus second)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionDifference {
    pub width: i64,
    pub height: i64,
}

/// Bounding box of mismatching pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffBounds {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

/// Comparison metadata returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    pub is_same_dimensions: bool,
    pub dimension_difference: DimensionDifference,
    pub raw_mis_match_percentage: f64,
    /// `raw_mis_match_percentage` rounded to two decimals
    pub mis_match_percentage: String,
    pub diff_bounds: DiffBounds,
    /// Milliseconds spent comparing
    pub analysis_time: u64,
}

impl DiffReport {
    /// Report for same-sized inputs with the given raw mismatch percentage
    pub fn new(raw_mis_match_percentage: f64) -> Self {
        Self {
            is_same_dimensions: true,
            dimension_difference: DimensionDifference::default(),
            raw_mis_match_percentage,
            mis_match_percentage: format_percentage(raw_mis_match_percentage),
            diff_bounds: DiffBounds::default(),
            analysis_time: 0,
        }
    }
}

pub fn format_percentage(raw: f64) -> String {
    format!("{:.2}", raw)
}

/// Result of one comparison: the rendered PNG and its metadata
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    pub image: Vec<u8>,
    pub report: DiffReport,
}

/// Trait for engines that compare two encoded images
///
/// Implementations must be pure with respect to their inputs; the service
/// may call them concurrently from blocking worker threads.
pub trait DiffEngine: Send + Sync {
    /// Compare `first` against `second`
    ///
    /// # Errors
    /// Returns [`DiffError`] if either input can't be decoded or the diff
    /// can't be rendered
    fn compare(
        &self,
        first: &[u8],
        second: &[u8],
        options: &DiffOptions,
    ) -> Result<DiffOutcome, DiffError>;
}
