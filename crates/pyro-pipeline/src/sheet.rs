//! Sheet geometry: physical paper sizes to pixel targets, and fitting images
//! onto them.

use std::fmt;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RenderError, Result};
use crate::params::{Dpi, UnknownVariant};

const MM_PER_INCH: f64 = 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SheetSize {
    A4,
    A3,
}

impl SheetSize {
    pub const ALL: [SheetSize; 2] = [Self::A4, Self::A3];

    /// Portrait width × height in millimetres.
    pub fn millimetres(self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::A3 => "A3",
        }
    }
}

impl fmt::Display for SheetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SheetSize {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A4" => Ok(Self::A4),
            "A3" => Ok(Self::A3),
            other => Err(UnknownVariant {
                kind: "sheet size",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// How an image is mapped onto a target rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPolicy {
    /// Centre-crop to the target aspect, then resize. Fills the whole sheet.
    Fill,
    /// Shrink to fit (never enlarge) and centre on a white canvas.
    Fit,
}

/// Resolved output rectangle for a final render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderTarget {
    pub sheet: SheetSize,
    pub orientation: Orientation,
    pub width_px: u32,
    pub height_px: u32,
}

impl RenderTarget {
    /// Landscape is chosen only when the adjusted image is wider than tall.
    pub fn for_image(sheet: SheetSize, dpi: Dpi, img: &GrayImage) -> Self {
        let landscape = img.width() > img.height();
        let (width_px, height_px) = target_pixels(sheet, dpi, landscape);
        Self {
            sheet,
            orientation: if landscape {
                Orientation::Landscape
            } else {
                Orientation::Portrait
            },
            width_px,
            height_px,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }
}

/// Pixel size of `sheet` at `dpi`: `round(mm / 25.4 * dpi)` per axis, swapped
/// when `landscape`.
pub fn target_pixels(sheet: SheetSize, dpi: Dpi, landscape: bool) -> (u32, u32) {
    let (w_mm, h_mm) = sheet.millimetres();
    let dpi = f64::from(dpi.value());
    let w = (f64::from(w_mm) / MM_PER_INCH * dpi).round() as u32;
    let h = (f64::from(h_mm) / MM_PER_INCH * dpi).round() as u32;
    if landscape { (h, w) } else { (w, h) }
}

/// Map `img` onto exactly `(tw, th)` pixels using `policy`.
pub fn fit_to_target(img: &GrayImage, target: (u32, u32), policy: FitPolicy) -> Result<GrayImage> {
    let (tw, th) = target;
    let (w, h) = img.dimensions();
    if tw == 0 || th == 0 {
        return Err(RenderError::InvalidTarget(format!("{tw}x{th}")));
    }
    if w == 0 || h == 0 {
        return Err(RenderError::InvalidTarget(format!("empty source {w}x{h}")));
    }

    let out = match policy {
        FitPolicy::Fill => fill(img, tw, th),
        FitPolicy::Fit => fit(img, tw, th),
    };
    debug!(w, h, tw, th, ?policy, "Fitted image to target");
    Ok(out)
}

fn fill(img: &GrayImage, tw: u32, th: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    let target_ratio = f64::from(tw) / f64::from(th);
    let src_ratio = f64::from(w) / f64::from(h);

    let (x0, y0, cw, ch) = if src_ratio > target_ratio {
        let new_w = ((f64::from(h) * target_ratio) as u32).clamp(1, w);
        ((w - new_w) / 2, 0, new_w, h)
    } else {
        let new_h = ((f64::from(w) / target_ratio) as u32).clamp(1, h);
        (0, (h - new_h) / 2, w, new_h)
    };

    let cropped = imageops::crop_imm(img, x0, y0, cw, ch).to_image();
    if cropped.dimensions() == (tw, th) {
        return cropped;
    }
    imageops::resize(&cropped, tw, th, FilterType::Lanczos3)
}

fn fit(img: &GrayImage, tw: u32, th: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    let scale = (f64::from(tw) / f64::from(w))
        .min(f64::from(th) / f64::from(h))
        .min(1.0);
    let nw = ((f64::from(w) * scale).round() as u32).clamp(1, tw);
    let nh = ((f64::from(h) * scale).round() as u32).clamp(1, th);

    let scaled = if (nw, nh) == (w, h) {
        img.clone()
    } else {
        imageops::resize(img, nw, nh, FilterType::Lanczos3)
    };

    let mut canvas = GrayImage::from_pixel(tw, th, Luma([255]));
    let x = i64::from((tw - nw) / 2);
    let y = i64::from((th - nh) / 2);
    imageops::replace(&mut canvas, &scaled, x, y);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_at_300_dpi() {
        assert_eq!(target_pixels(SheetSize::A4, Dpi::D300, false), (2480, 3508));
        assert_eq!(target_pixels(SheetSize::A4, Dpi::D300, true), (3508, 2480));
    }

    #[test]
    fn a3_at_other_dpis() {
        assert_eq!(target_pixels(SheetSize::A3, Dpi::D300, false), (3508, 4961));
        assert_eq!(target_pixels(SheetSize::A4, Dpi::D203, false), (1678, 2374));
        assert_eq!(target_pixels(SheetSize::A4, Dpi::D600, false), (4961, 7016));
    }

    #[test]
    fn orientation_follows_image_shape() {
        let wide = GrayImage::new(20, 10);
        let tall = GrayImage::new(10, 20);
        let square = GrayImage::new(10, 10);
        let t = RenderTarget::for_image(SheetSize::A4, Dpi::D300, &wide);
        assert_eq!(t.orientation, Orientation::Landscape);
        assert_eq!(t.dimensions(), (3508, 2480));
        assert_eq!(
            RenderTarget::for_image(SheetSize::A4, Dpi::D300, &tall).orientation,
            Orientation::Portrait
        );
        assert_eq!(
            RenderTarget::for_image(SheetSize::A4, Dpi::D300, &square).orientation,
            Orientation::Portrait
        );
    }

    #[test]
    fn fill_produces_exact_size_and_crops_centre() {
        // left third black, middle white, right third black
        let img = GrayImage::from_fn(30, 10, |x, _| {
            if (10..20).contains(&x) { Luma([255]) } else { Luma([0]) }
        });
        let out = fit_to_target(&img, (10, 10), FitPolicy::Fill).unwrap();
        assert_eq!(out.dimensions(), (10, 10));
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn fill_crops_tall_sources_vertically() {
        let img = GrayImage::from_fn(10, 40, |_, y| {
            if (15..25).contains(&y) { Luma([0]) } else { Luma([255]) }
        });
        let out = fit_to_target(&img, (10, 10), FitPolicy::Fill).unwrap();
        assert_eq!(out.dimensions(), (10, 10));
        assert!(out.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn fill_is_exact_for_any_aspect() {
        for (w, h) in [(50, 50), (400, 20), (20, 400), (333, 251)] {
            let img = GrayImage::from_pixel(w, h, Luma([90]));
            for target in [(64, 90), (90, 64), (31, 31)] {
                let out = fit_to_target(&img, target, FitPolicy::Fill).unwrap();
                assert_eq!(out.dimensions(), target, "source {w}x{h}");
            }
        }
    }

    #[test]
    fn fit_pads_with_white_and_never_upscales() {
        let img = GrayImage::from_pixel(4, 2, Luma([0]));
        let out = fit_to_target(&img, (10, 10), FitPolicy::Fit).unwrap();
        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(out.get_pixel(0, 0).0[0], 255);
        assert_eq!(out.get_pixel(3, 4).0[0], 0);
        let black = out.pixels().filter(|p| p.0[0] == 0).count();
        assert_eq!(black, 8);
    }

    #[test]
    fn fit_downscales_preserving_aspect() {
        let img = GrayImage::from_pixel(40, 20, Luma([0]));
        let out = fit_to_target(&img, (10, 10), FitPolicy::Fit).unwrap();
        assert_eq!(out.dimensions(), (10, 10));
        // 10x5 band in the middle rows
        assert_eq!(out.get_pixel(5, 0).0[0], 255);
        assert_eq!(out.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn zero_target_is_rejected() {
        let img = GrayImage::new(3, 3);
        assert!(matches!(
            fit_to_target(&img, (0, 5), FitPolicy::Fill),
            Err(RenderError::InvalidTarget(_))
        ));
    }

    #[test]
    fn sheet_size_parses_case_insensitively() {
        assert_eq!("a3".parse::<SheetSize>().unwrap(), SheetSize::A3);
        assert!("A5".parse::<SheetSize>().is_err());
    }
}
