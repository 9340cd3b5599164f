//! Bounded parameter state driving the render pipeline.
//!
//! [`ParameterState`] is the one piece of mutable domain state per session.
//! Numeric fields carry explicit closed bounds ([`Bounds`]); enumerated fields
//! are closed Rust enums with stable string/integer codes used for persistence
//! and for the caption shown to the user.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tolerance used to decide whether a float parameter sits at its neutral value.
pub const NEUTRAL_EPSILON: f32 = 1e-3;

/// Closed interval `[min, max]` for a numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the interval. NaN collapses to `min`.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

pub const BRIGHTNESS_BOUNDS: Bounds = Bounds::new(0.1, 3.0);
pub const CONTRAST_BOUNDS: Bounds = Bounds::new(0.1, 3.0);
pub const GAMMA_BOUNDS: Bounds = Bounds::new(0.2, 5.0);
pub const SHARPNESS_BOUNDS: Bounds = Bounds::new(0.0, 5.0);
pub const BLUR_BOUNDS: Bounds = Bounds::new(0.0, 2.0);

pub const DEFAULT_BRIGHTNESS: f32 = 1.0;
pub const DEFAULT_CONTRAST: f32 = 1.0;
pub const DEFAULT_GAMMA: f32 = 1.0;
pub const DEFAULT_SHARPNESS: f32 = 2.0;
pub const DEFAULT_BLUR: f32 = 0.0;

/// Error returned when a persisted or user-supplied code is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Monochrome reduction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DitherMode {
    /// Floyd–Steinberg error diffusion.
    #[default]
    ErrorDiffusion,
    /// 8×8 Bayer ordered dithering.
    Ordered,
    /// Plain threshold at mid-gray.
    Threshold,
}

impl DitherMode {
    pub const CYCLE: [DitherMode; 3] = [Self::ErrorDiffusion, Self::Ordered, Self::Threshold];

    /// Stable short code (`fs`, `ordered`, `none`).
    pub fn code(self) -> &'static str {
        match self {
            Self::ErrorDiffusion => "fs",
            Self::Ordered => "ordered",
            Self::Threshold => "none",
        }
    }
}

impl fmt::Display for DitherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DitherMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs" | "error_diffusion" | "floyd_steinberg" => Ok(Self::ErrorDiffusion),
            "ordered" | "bayer" => Ok(Self::Ordered),
            "none" | "threshold" => Ok(Self::Threshold),
            other => Err(UnknownVariant::new("dither", other)),
        }
    }
}

/// Output resolution in dots per inch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Dpi {
    D203,
    #[default]
    D300,
    D406,
    D600,
}

impl Dpi {
    pub const CYCLE: [Dpi; 4] = [Self::D203, Self::D300, Self::D406, Self::D600];

    pub fn value(self) -> u32 {
        match self {
            Self::D203 => 203,
            Self::D300 => 300,
            Self::D406 => 406,
            Self::D600 => 600,
        }
    }
}

impl TryFrom<u32> for Dpi {
    type Error = UnknownVariant;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::CYCLE
            .into_iter()
            .find(|d| d.value() == value)
            .ok_or_else(|| UnknownVariant::new("dpi", value.to_string()))
    }
}

impl From<Dpi> for u32 {
    fn from(dpi: Dpi) -> Self {
        dpi.value()
    }
}

impl fmt::Display for Dpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Median-filter window used for denoising. `Off` disables the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Denoise {
    #[default]
    Off,
    Window3,
    Window5,
}

impl Denoise {
    pub const CYCLE: [Denoise; 3] = [Self::Off, Self::Window3, Self::Window5];

    /// Window side length, 0 when disabled.
    pub fn size(self) -> u32 {
        match self {
            Self::Off => 0,
            Self::Window3 => 3,
            Self::Window5 => 5,
        }
    }
}

impl TryFrom<u32> for Denoise {
    type Error = UnknownVariant;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::CYCLE
            .into_iter()
            .find(|d| d.size() == value)
            .ok_or_else(|| UnknownVariant::new("denoise", value.to_string()))
    }
}

impl From<Denoise> for u32 {
    fn from(d: Denoise) -> Self {
        d.size()
    }
}

impl fmt::Display for Denoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.size())
    }
}

/// File format of the final render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Bitmap,
    Png,
    Tiff,
    Jpeg,
}

impl OutputFormat {
    pub const CYCLE: [OutputFormat; 4] = [Self::Bitmap, Self::Png, Self::Tiff, Self::Jpeg];

    /// Stable short code, also the file extension.
    pub fn code(self) -> &'static str {
        match self {
            Self::Bitmap => "bmp",
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::Jpeg => "jpg",
        }
    }

    pub fn extension(self) -> &'static str {
        self.code()
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Bitmap => "image/bmp",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Lossy formats cannot hold a 1-bit raster and get 8-bit grayscale instead.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OutputFormat {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bmp" | "bitmap" => Ok(Self::Bitmap),
            "png" => Ok(Self::Png),
            "tif" | "tiff" => Ok(Self::Tiff),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            other => Err(UnknownVariant::new("output format", other)),
        }
    }
}

/// Per-session render parameters plus the last uploaded original.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    pub brightness: f32,
    pub contrast: f32,
    pub gamma: f32,
    pub sharpness: f32,
    pub invert: bool,
    pub denoise: Denoise,
    pub blur_radius: f32,
    pub dither: DitherMode,
    pub dpi: Dpi,
    pub output_format: OutputFormat,
    #[serde(skip)]
    pub source_image: Option<Vec<u8>>,
}

impl Default for ParameterState {
    fn default() -> Self {
        Self {
            brightness: DEFAULT_BRIGHTNESS,
            contrast: DEFAULT_CONTRAST,
            gamma: DEFAULT_GAMMA,
            sharpness: DEFAULT_SHARPNESS,
            invert: false,
            denoise: Denoise::default(),
            blur_radius: DEFAULT_BLUR,
            dither: DitherMode::default(),
            dpi: Dpi::default(),
            output_format: OutputFormat::default(),
            source_image: None,
        }
    }
}

impl fmt::Debug for ParameterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterState")
            .field("brightness", &self.brightness)
            .field("contrast", &self.contrast)
            .field("gamma", &self.gamma)
            .field("sharpness", &self.sharpness)
            .field("invert", &self.invert)
            .field("denoise", &self.denoise)
            .field("blur_radius", &self.blur_radius)
            .field("dither", &self.dither)
            .field("dpi", &self.dpi)
            .field("output_format", &self.output_format)
            .field("source_image", &self.source_image.as_ref().map(Vec::len))
            .finish()
    }
}

impl ParameterState {
    pub fn has_image(&self) -> bool {
        self.source_image.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Clamp every numeric field into its bounds.
    ///
    /// Returns `true` when anything had to change, so callers loading persisted
    /// rows can log the correction.
    pub fn clamp_in_place(&mut self) -> bool {
        let before = (
            self.brightness,
            self.contrast,
            self.gamma,
            self.sharpness,
            self.blur_radius,
        );
        self.brightness = BRIGHTNESS_BOUNDS.clamp(self.brightness);
        self.contrast = CONTRAST_BOUNDS.clamp(self.contrast);
        self.gamma = GAMMA_BOUNDS.clamp(self.gamma);
        self.sharpness = SHARPNESS_BOUNDS.clamp(self.sharpness);
        self.blur_radius = BLUR_BOUNDS.clamp(self.blur_radius);
        let after = (
            self.brightness,
            self.contrast,
            self.gamma,
            self.sharpness,
            self.blur_radius,
        );
        // NaN != NaN, so a NaN field always reports a correction.
        before != after
    }

    /// Restore adjustment fields, keeping the uploaded image and output format.
    pub fn reset(&mut self) {
        let source_image = self.source_image.take();
        let output_format = self.output_format;
        *self = Self {
            source_image,
            output_format,
            ..Self::default()
        };
    }
}

/// Whether `value` is within [`NEUTRAL_EPSILON`] of `neutral`.
pub fn is_neutral(value: f32, neutral: f32) -> bool {
    (value - neutral).abs() <= NEUTRAL_EPSILON
}
