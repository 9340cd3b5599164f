//! Image pipeline for pyrography and thermal sheet printing.
//!
//! Turns a photo into a 1-bit raster sized for an A-series sheet: tone
//! adjustment, monochrome reduction (error diffusion, ordered, threshold),
//! sheet geometry and encoding with embedded DPI. The parameter state machine
//! that drives it lives in [`command`].

pub mod command;
pub mod cycle;
pub mod dither;
pub mod encode;
pub mod error;
pub mod params;
pub mod render;
pub mod sheet;
pub mod tone;

// Re-exports for convenience
pub use command::{Command, CommandError, Field, Outcome};
pub use cycle::cycle_next;
pub use dither::reduce;
pub use error::{RenderError, Result};
pub use params::{Denoise, DitherMode, Dpi, OutputFormat, ParameterState};
pub use render::{FinalOptions, FinalRender, PreviewOptions, render_final, render_preview};
pub use sheet::{FitPolicy, Orientation, RenderTarget, SheetSize, fit_to_target, target_pixels};
pub use tone::{adjust, decode};
