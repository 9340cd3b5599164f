//! Preview and final renders.
//!
//! Both entry points are deterministic for a given source and parameter state.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use tracing::{debug, info};

use crate::dither::reduce;
use crate::encode::{encode, encode_jpeg};
use crate::error::Result;
use crate::params::{OutputFormat, ParameterState};
use crate::sheet::{FitPolicy, RenderTarget, SheetSize, fit_to_target};
use crate::tone::adjust;

pub const DEFAULT_PREVIEW_WIDTH: u32 = 1024;
pub const DEFAULT_PREVIEW_QUALITY: u8 = 90;
pub const DEFAULT_FINAL_JPEG_QUALITY: u8 = 95;
pub const DEFAULT_FILENAME_PREFIX: &str = "pyro";

#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub max_width: u32,
    pub quality: u8,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_PREVIEW_WIDTH,
            quality: DEFAULT_PREVIEW_QUALITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FinalOptions {
    pub jpeg_quality: u8,
    pub filename_prefix: String,
}

impl Default for FinalOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_FINAL_JPEG_QUALITY,
            filename_prefix: DEFAULT_FILENAME_PREFIX.to_string(),
        }
    }
}

/// Encoded final output plus the metadata needed to deliver it.
#[derive(Clone, Serialize)]
pub struct FinalRender {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
    pub target: RenderTarget,
}

impl std::fmt::Debug for FinalRender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalRender")
            .field("bytes", &self.bytes.len())
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("target", &self.target)
            .finish()
    }
}

impl FinalRender {
    pub fn width(&self) -> u32 {
        self.target.width_px
    }

    pub fn height(&self) -> u32 {
        self.target.height_px
    }
}

/// `{prefix}_{sheet}_{dpi}dpi.{ext}`
pub fn final_filename(prefix: &str, sheet: SheetSize, dpi: u32, format: OutputFormat) -> String {
    format!("{prefix}_{sheet}_{dpi}dpi.{}", format.extension())
}

/// Downscale to at most `max_width`, keeping aspect ratio. Never enlarges.
fn limit_width(img: GrayImage, max_width: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    let max_width = max_width.max(1);
    if w <= max_width {
        return img;
    }
    let ratio = f64::from(max_width) / f64::from(w);
    let new_height = ((f64::from(h) * ratio).round() as u32).max(1);
    debug!(orig_w = w, orig_h = h, new_width = max_width, new_height, "Downscaling preview");
    imageops::resize(&img, max_width, new_height, FilterType::Lanczos3)
}

/// Low-bandwidth JPEG preview of the current settings.
pub fn render_preview(
    src: &DynamicImage,
    state: &ParameterState,
    opts: &PreviewOptions,
) -> Result<Vec<u8>> {
    let toned = adjust(src, state);
    let scaled = limit_width(toned, opts.max_width);
    let mono = reduce(&scaled, state.dither);
    let bytes = encode_jpeg(&mono, opts.quality, None)?;
    debug!(
        width = mono.width(),
        height = mono.height(),
        bytes = bytes.len(),
        dither = %state.dither,
        "Rendered preview"
    );
    Ok(bytes)
}

/// Full-resolution output for `sheet` in the state's output format.
pub fn render_final(
    src: &DynamicImage,
    state: &ParameterState,
    sheet: SheetSize,
    opts: &FinalOptions,
) -> Result<FinalRender> {
    let toned = adjust(src, state);
    let target = RenderTarget::for_image(sheet, state.dpi, &toned);
    let fitted = fit_to_target(&toned, target.dimensions(), FitPolicy::Fill)?;
    drop(toned);
    let mono = reduce(&fitted, state.dither);
    let dpi = state.dpi.value();
    let bytes = encode(&mono, state.output_format, dpi, opts.jpeg_quality)?;

    let filename = final_filename(&opts.filename_prefix, sheet, dpi, state.output_format);
    info!(
        %filename,
        width = target.width_px,
        height = target.height_px,
        orientation = ?target.orientation,
        bytes = bytes.len(),
        "Rendered final output"
    );

    Ok(FinalRender {
        bytes,
        filename,
        content_type: state.output_format.content_type(),
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{DitherMode, Dpi};
    use crate::sheet::Orientation;
    use image::{Luma, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            let v = ((x * 255) / width.max(1)) as u8;
            Rgb([v, v, ((y * 255) / height.max(1)) as u8])
        }))
    }

    #[test]
    fn preview_is_bounded_jpeg() {
        let src = gradient(2000, 500);
        let bytes = render_preview(&src, &ParameterState::default(), &PreviewOptions::default())
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1024, 256));
    }

    #[test]
    fn preview_never_upscales() {
        let src = gradient(300, 200);
        let opts = PreviewOptions {
            max_width: 1024,
            quality: 80,
        };
        let bytes = render_preview(&src, &ParameterState::default(), &opts).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 200));
    }

    #[test]
    fn final_landscape_bitmap_at_default_settings() {
        let src = gradient(400, 200);
        let out = render_final(&src, &ParameterState::default(), SheetSize::A4, &FinalOptions::default())
            .unwrap();
        assert_eq!(out.filename, "pyro_A4_300dpi.bmp");
        assert_eq!(out.content_type, "image/bmp");
        assert_eq!(out.target.orientation, Orientation::Landscape);
        assert_eq!((out.width(), out.height()), (3508, 2480));
        assert_eq!(&out.bytes[0..2], b"BM");
    }

    #[test]
    fn final_respects_format_dpi_and_prefix() {
        let src = gradient(100, 300);
        let state = ParameterState {
            dpi: Dpi::D203,
            output_format: OutputFormat::Png,
            dither: DitherMode::Ordered,
            ..ParameterState::default()
        };
        let opts = FinalOptions {
            filename_prefix: "burn".into(),
            ..FinalOptions::default()
        };
        let out = render_final(&src, &state, SheetSize::A3, &opts).unwrap();
        assert_eq!(out.filename, "burn_A3_203dpi.png");
        assert_eq!(out.target.orientation, Orientation::Portrait);
        let decoded = image::load_from_memory(&out.bytes).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (out.width(), out.height()));
        assert!(decoded.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn final_is_deterministic() {
        let src = gradient(120, 80);
        let state = ParameterState {
            output_format: OutputFormat::Tiff,
            dpi: Dpi::D203,
            ..ParameterState::default()
        };
        let a = render_final(&src, &state, SheetSize::A4, &FinalOptions::default()).unwrap();
        let b = render_final(&src, &state, SheetSize::A4, &FinalOptions::default()).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn same_command_sequence_gives_same_bytes() {
        use crate::command::{Command, Field};

        let src = gradient(90, 60);
        let run = |state: &mut ParameterState| {
            for token in ["adj:contrast:+0.3", "adj:gamma:-0.5", "cycle:dither", "toggle:invert"] {
                state.apply(token.parse::<Command>().unwrap()).unwrap();
            }
            state.apply(Command::Adjust(Field::Blur, 0.4)).unwrap();
            render_final(&src, state, SheetSize::A4, &FinalOptions::default())
                .unwrap()
                .bytes
        };

        let mut state = ParameterState {
            source_image: Some(vec![1]),
            ..ParameterState::default()
        };
        let first = run(&mut state);
        state.apply(Command::Reset).unwrap();
        let second = run(&mut state);
        assert_eq!(first, second);
    }

    #[test]
    fn limit_width_keeps_small_images() {
        let img = GrayImage::from_pixel(10, 4, Luma([9]));
        assert_eq!(limit_width(img.clone(), 64), img);
        assert_eq!(limit_width(img, 5).dimensions(), (5, 2));
    }
}
