//! Tone pipeline: colour source to adjusted 8-bit grayscale.
//!
//! Steps run in a fixed order and each one is skipped when its parameter sits
//! at the neutral value:
//!
//! 1. luminance (ITU-R 601 integer weights)
//! 2. brightness
//! 3. contrast around mid-gray
//! 4. gamma via a 256-entry lookup table
//! 5. sharpness (blend against a 3×3 smoothing)
//! 6. median denoise
//! 7. gaussian blur
//! 8. invert

use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use crate::error::{RenderError, Result};
use crate::params::{Denoise, ParameterState, is_neutral};

const MID_GRAY: f32 = 128.0;
const SMOOTH_CENTER: u32 = 5;
const SMOOTH_SCALE: u32 = 13;

/// Decode uploaded bytes into an image, guessing the container from content.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(RenderError::Decode)
}

/// Run the full tone pipeline. The source image is never modified.
pub fn adjust(img: &DynamicImage, state: &ParameterState) -> GrayImage {
    let (width, height) = (img.width(), img.height());
    debug!(width, height, "Running tone pipeline");

    let mut gray = to_luma(img);

    if !is_neutral(state.brightness, 1.0) {
        map_pixels(&mut gray, |v| v * state.brightness);
    }
    if !is_neutral(state.contrast, 1.0) {
        map_pixels(&mut gray, |v| MID_GRAY + state.contrast * (v - MID_GRAY));
    }
    if !is_neutral(state.gamma, 1.0) {
        apply_lut(&mut gray, &gamma_lut(state.gamma));
    }
    if !is_neutral(state.sharpness, 1.0) {
        gray = sharpen(&gray, state.sharpness);
    }
    if state.denoise != Denoise::Off {
        let radius = state.denoise.size() / 2;
        gray = imageproc::filter::median_filter(&gray, radius, radius);
    }
    if state.blur_radius > crate::params::NEUTRAL_EPSILON {
        gray = imageproc::filter::gaussian_blur_f32(&gray, state.blur_radius);
    }
    if state.invert {
        image::imageops::invert(&mut gray);
    }

    gray
}

/// ITU-R 601-2 luma with 16-bit fixed point weights.
fn to_luma(img: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = img {
        return gray.clone();
    }
    let rgb = img.to_rgb8();
    let mut out = GrayImage::new(rgb.width(), rgb.height());
    for (dst, src) in out.pixels_mut().zip(rgb.pixels()) {
        let [r, g, b] = src.0;
        let l = (u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16;
        *dst = Luma([l.min(255) as u8]);
    }
    out
}

fn clamp_trunc(v: f32) -> u8 {
    // `as` saturates and truncates toward zero; NaN becomes 0.
    v.clamp(0.0, 255.0) as u8
}

fn map_pixels(img: &mut GrayImage, f: impl Fn(f32) -> f32) {
    for p in img.pixels_mut() {
        p.0[0] = clamp_trunc(f(f32::from(p.0[0])));
    }
}

fn apply_lut(img: &mut GrayImage, lut: &[u8; 256]) {
    for p in img.pixels_mut() {
        p.0[0] = lut[usize::from(p.0[0])];
    }
}

/// `LUT[i] = round(255 * (i / 255) ^ (1 / gamma))`.
pub fn gamma_lut(gamma: f32) -> [u8; 256] {
    let inv = 1.0 / f64::from(gamma);
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        let v = 255.0 * (i as f64 / 255.0).powf(inv);
        *slot = v.round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// 3×3 smoothing with kernel `[1 1 1; 1 5 1; 1 1 1] / 13`, border copied.
fn smooth(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = img.clone();
    if w < 3 || h < 3 {
        return out;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut sum = 0u32;
            for dy in 0..3 {
                for dx in 0..3 {
                    let v = u32::from(img.get_pixel(x + dx - 1, y + dy - 1).0[0]);
                    let weight = if dx == 1 && dy == 1 { SMOOTH_CENTER } else { 1 };
                    sum += v * weight;
                }
            }
            let v = (sum + SMOOTH_SCALE / 2) / SMOOTH_SCALE;
            out.put_pixel(x, y, Luma([v.min(255) as u8]));
        }
    }
    out
}

fn sharpen(img: &GrayImage, factor: f32) -> GrayImage {
    let smoothed = smooth(img);
    let mut out = img.clone();
    for (dst, s) in out.pixels_mut().zip(smoothed.pixels()) {
        let v = f32::from(dst.0[0]);
        let s = f32::from(s.0[0]);
        dst.0[0] = clamp_trunc(s + factor * (v - s));
    }
    out
}
