//! Parameter state machine.
//!
//! Every user action is a [`Command`]. Commands parse from and print to the
//! compact control tokens used by transports (`adj:gamma:+0.5`,
//! `cycle:dither`, `reset`, ...). [`ParameterState::apply`] mutates the state,
//! always keeping numeric fields inside their bounds.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::cycle::cycle_next;
use crate::params::{
    BLUR_BOUNDS, BRIGHTNESS_BOUNDS, Bounds, CONTRAST_BOUNDS, Denoise, DitherMode, Dpi,
    GAMMA_BOUNDS, OutputFormat, ParameterState, SHARPNESS_BOUNDS,
};
use crate::sheet::SheetSize;

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("send a photo first")]
    MissingImage,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid adjustment delta: {0}")]
    InvalidDelta(String),
}

/// Numeric parameter addressed by `adj:<field>:<delta>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Brightness,
    Contrast,
    Gamma,
    Sharpness,
    Blur,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Self::Brightness,
        Self::Contrast,
        Self::Gamma,
        Self::Sharpness,
        Self::Blur,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Gamma => "gamma",
            Self::Sharpness => "sharpness",
            Self::Blur => "blur",
        }
    }

    pub fn bounds(self) -> Bounds {
        match self {
            Self::Brightness => BRIGHTNESS_BOUNDS,
            Self::Contrast => CONTRAST_BOUNDS,
            Self::Gamma => GAMMA_BOUNDS,
            Self::Sharpness => SHARPNESS_BOUNDS,
            Self::Blur => BLUR_BOUNDS,
        }
    }

    /// Step used by the stock controls.
    pub fn step(self) -> f32 {
        match self {
            Self::Brightness | Self::Contrast => 0.3,
            Self::Gamma | Self::Sharpness => 0.5,
            Self::Blur => 0.2,
        }
    }

    fn slot(self, state: &mut ParameterState) -> &mut f32 {
        match self {
            Self::Brightness => &mut state.brightness,
            Self::Contrast => &mut state.contrast,
            Self::Gamma => &mut state.gamma,
            Self::Sharpness => &mut state.sharpness,
            Self::Blur => &mut state.blur_radius,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Field {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.code() == s)
            .ok_or_else(|| CommandError::UnknownCommand(format!("adj:{s}")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Adjust(Field, f32),
    ToggleInvert,
    CycleDither,
    CycleDpi,
    CycleDenoise,
    CycleOutputFormat,
    Reset,
    NewUpload(Vec<u8>),
}

impl Command {
    /// Whether the command is rejected until an image has been uploaded.
    pub fn requires_image(&self) -> bool {
        matches!(
            self,
            Self::Adjust(..) | Self::ToggleInvert | Self::CycleDither | Self::CycleDenoise
        )
    }

    /// Whether a successful application counts as a settings change.
    pub fn is_setting_change(&self) -> bool {
        !matches!(self, Self::NewUpload(_))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adjust(field, delta) => write!(f, "adj:{field}:{delta:+}"),
            Self::ToggleInvert => f.write_str("toggle:invert"),
            Self::CycleDither => f.write_str("cycle:dither"),
            Self::CycleDpi => f.write_str("cycle:dpi"),
            Self::CycleDenoise => f.write_str("cycle:denoise"),
            Self::CycleOutputFormat => f.write_str("cycle:outfmt"),
            Self::Reset => f.write_str("reset"),
            Self::NewUpload(bytes) => write!(f, "upload({} bytes)", bytes.len()),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let mut parts = token.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("adj"), Some(field), Some(delta), None) => {
                let field = field.parse::<Field>()?;
                let delta = delta
                    .parse::<f32>()
                    .ok()
                    .filter(|d| d.is_finite())
                    .ok_or_else(|| CommandError::InvalidDelta(delta.to_string()))?;
                Ok(Self::Adjust(field, delta))
            }
            (Some("toggle"), Some("invert"), None, None) => Ok(Self::ToggleInvert),
            (Some("cycle"), Some("dither"), None, None) => Ok(Self::CycleDither),
            (Some("cycle"), Some("dpi"), None, None) => Ok(Self::CycleDpi),
            (Some("cycle"), Some("denoise"), None, None) => Ok(Self::CycleDenoise),
            (Some("cycle"), Some("outfmt"), None, None) => Ok(Self::CycleOutputFormat),
            (Some("reset"), None, None, None) => Ok(Self::Reset),
            _ => Err(CommandError::UnknownCommand(token.to_string())),
        }
    }
}

/// Result of a successfully applied command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// A fresh preview should be produced.
    pub rerender: bool,
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

impl ParameterState {
    pub fn apply(&mut self, cmd: Command) -> Result<Outcome, CommandError> {
        if cmd.requires_image() && !self.has_image() {
            return Err(CommandError::MissingImage);
        }

        match cmd {
            Command::Adjust(field, delta) => {
                let bounds = field.bounds();
                let slot = field.slot(self);
                *slot = bounds.clamp(round2(bounds.clamp(*slot + delta)));
            }
            Command::ToggleInvert => self.invert = !self.invert,
            Command::CycleDither => {
                self.dither = cycle_next(&DitherMode::CYCLE, &self.dither, DitherMode::default());
            }
            Command::CycleDpi => {
                self.dpi = cycle_next(&Dpi::CYCLE, &self.dpi, Dpi::default());
            }
            Command::CycleDenoise => {
                self.denoise = cycle_next(&Denoise::CYCLE, &self.denoise, Denoise::default());
            }
            Command::CycleOutputFormat => {
                self.output_format = cycle_next(
                    &OutputFormat::CYCLE,
                    &self.output_format,
                    OutputFormat::default(),
                );
            }
            Command::Reset => self.reset(),
            Command::NewUpload(bytes) => {
                if bytes.is_empty() {
                    return Err(CommandError::MissingImage);
                }
                self.source_image = Some(bytes);
            }
        }

        Ok(Outcome {
            rerender: self.has_image(),
        })
    }
}

/// Token that requests a final render of `sheet`.
pub fn size_token(sheet: SheetSize) -> String {
    format!("size:{sheet}")
}

/// Parse `size:A4` / `size:A3`.
pub fn parse_size_token(token: &str) -> Option<SheetSize> {
    token.strip_prefix("size:")?.parse().ok()
}

/// Control tokens offered for `state`: stock adjustments, toggles, cycles,
/// reset, and (once an image exists) the final size tokens.
pub fn available_tokens(state: &ParameterState) -> Vec<String> {
    let mut tokens = Vec::with_capacity(20);
    for field in Field::ALL {
        let step = field.step();
        tokens.push(Command::Adjust(field, -step).to_string());
        tokens.push(Command::Adjust(field, step).to_string());
    }
    for cmd in [
        Command::ToggleInvert,
        Command::CycleDither,
        Command::CycleDpi,
        Command::CycleDenoise,
        Command::CycleOutputFormat,
        Command::Reset,
    ] {
        tokens.push(cmd.to_string());
    }
    if state.has_image() {
        tokens.extend(SheetSize::ALL.into_iter().map(size_token));
    }
    tokens
}

fn join<T: fmt::Display>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Caption listing current values with their legal ranges.
pub fn caption(state: &ParameterState) -> String {
    let range = |b: Bounds| format!("(min {}, max {})", b.min, b.max);
    let headline = if state.has_image() {
        "Preview. Tune the settings, then pick a sheet size."
    } else {
        "No photo yet: send a photo first. Current settings:"
    };
    let lines = [
        headline.to_string(),
        String::new(),
        format!("Brightness: {:.2} {}", state.brightness, range(BRIGHTNESS_BOUNDS)),
        format!("Contrast: {:.2} {}", state.contrast, range(CONTRAST_BOUNDS)),
        format!("Gamma: {:.2} {}", state.gamma, range(GAMMA_BOUNDS)),
        format!("Sharpness: {:.2} {}", state.sharpness, range(SHARPNESS_BOUNDS)),
        format!(
            "Denoise: {} (options: {})",
            state.denoise,
            join(Denoise::CYCLE)
        ),
        format!("Blur: {:.2} {}", state.blur_radius, range(BLUR_BOUNDS)),
        format!("Invert: {}", if state.invert { "on" } else { "off" }),
        format!(
            "Dither: {} (options: {})",
            state.dither,
            join(DitherMode::CYCLE)
        ),
        format!("DPI: {} (options: {})", state.dpi, join(Dpi::CYCLE)),
        format!(
            "Format: {} (options: {})",
            state.output_format.code().to_ascii_uppercase(),
            join(OutputFormat::CYCLE.map(|f| f.code().to_ascii_uppercase()))
        ),
    ];
    lines.join("\n")
}

/// One-line summary delivered alongside a final file.
pub fn final_caption(state: &ParameterState, sheet: SheetSize) -> String {
    format!(
        "Final: {sheet}, {} DPI, {}, {}",
        state.dpi,
        state.dither,
        state.output_format.code().to_ascii_uppercase()
    )
}

pub const HELP_TEXT: &str = "Send a photo (PNG, JPEG or BMP) to get a black-and-white preview \
for pyrography. Use the controls to tune brightness, contrast, gamma, sharpness, denoise and \
blur, invert the image, or switch the dithering mode and DPI. Choose an output format \
(BMP/PNG/TIFF/JPG), then A4 or A3 to receive the final file. The final image fills the \
sheet by cropping, and its orientation follows the photo.";
