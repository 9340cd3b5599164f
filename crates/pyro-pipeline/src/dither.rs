//! Monochrome reduction of grayscale images.
//!
//! Three strategies, selected by [`DitherMode`]:
//! - Floyd-Steinberg error diffusion (sequential, raster order, classic
//!   bilevel conversion semantics)
//! - 8×8 Bayer ordered dithering (independent per pixel, rows run in parallel)
//! - plain threshold

use image::GrayImage;
use rayon::prelude::*;
use tracing::debug;

use crate::params::DitherMode;

/// Binarization threshold. Plain thresholding keeps values at or above it;
/// error diffusion keeps values strictly above it.
const THRESHOLD: u8 = 128;

/// 8×8 Bayer dispersed-dot matrix, row-major, values 0..=63.
const BAYER_8X8: [[u8; 8]; 8] = [
    [0, 48, 12, 60, 3, 51, 15, 63],
    [32, 16, 44, 28, 35, 19, 47, 31],
    [8, 56, 4, 52, 11, 59, 7, 55],
    [40, 24, 36, 20, 43, 27, 39, 23],
    [2, 50, 14, 62, 1, 49, 13, 61],
    [34, 18, 46, 30, 33, 17, 45, 29],
    [10, 58, 6, 54, 9, 57, 5, 53],
    [42, 26, 38, 22, 41, 25, 37, 21],
];

/// Reduce `img` to pure black and white. Output pixels are 0 or 255 and the
/// dimensions are unchanged.
pub fn reduce(img: &GrayImage, mode: DitherMode) -> GrayImage {
    match mode {
        DitherMode::ErrorDiffusion => floyd_steinberg_dither(img),
        DitherMode::Ordered => ordered_dither(img),
        DitherMode::Threshold => threshold_convert(img),
    }
}

/// Apply Floyd-Steinberg dithering.
///
/// Error distribution pattern:
/// - Right:        7/16
/// - Bottom-left:  3/16
/// - Bottom:       5/16
/// - Bottom-right: 1/16
///
/// Incoming error for a pixel is summed in sixteenths and divided once
/// (truncating toward zero). The adjusted value is clipped to 0..=255 before
/// the test `value > 128`, and the error passed on is taken from the clipped
/// value. This reproduces the classic bilevel conversion bit for bit.
pub fn floyd_steinberg_dither(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    debug!(width, height, "Applying Floyd-Steinberg dithering");

    let w = width as usize;
    let mut output = GrayImage::new(width, height);
    if w == 0 || height == 0 {
        return output;
    }

    let src = img.as_raw();
    let dst: &mut [u8] = &mut output;
    // errors[x + 1]: error (x16) waiting for column x from the row above.
    let mut errors = vec![0i32; w + 1];

    for (row, out_row) in src.chunks_exact(w).zip(dst.chunks_exact_mut(w)) {
        let mut right = 0i32;
        // Shares already owed to the next row, still missing later bottom-left parts.
        let mut below = 0i32;
        let mut below_right = 0i32;

        for x in 0..w {
            let value = (i32::from(row[x]) + (right + errors[x + 1]) / 16).clamp(0, 255);
            let new = if value > i32::from(THRESHOLD) { 255 } else { 0 };
            out_row[x] = new as u8;
            let error = value - new;

            // Slot x was read by the previous pixel; it now collects for the next row.
            errors[x] = 3 * error + below;
            below = 5 * error + below_right;
            below_right = error;
            right = 7 * error;
        }
        errors[w] = below;
    }

    debug!("Floyd-Steinberg dithering complete");
    output
}

/// Apply 8×8 Bayer ordered dithering.
///
/// A pixel becomes white when `v > (m + 0.5) * 4` for its matrix entry `m`.
pub fn ordered_dither(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    debug!(width, height, "Applying ordered dithering");

    let w = width as usize;
    let mut output = img.clone();
    if w == 0 {
        return output;
    }

    let buf: &mut [u8] = &mut output;
    buf.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let matrix_row = &BAYER_8X8[y % 8];
        for (x, px) in row.iter_mut().enumerate() {
            let threshold = (f32::from(matrix_row[x % 8]) + 0.5) * 4.0;
            *px = if f32::from(*px) > threshold { 255 } else { 0 };
        }
    });

    output
}

/// Threshold conversion without dithering: `v >= 128` becomes white.
pub fn threshold_convert(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    debug!(width, height, threshold = THRESHOLD, "Applying threshold conversion");

    let mut output = img.clone();
    for p in output.pixels_mut() {
        p.0[0] = if p.0[0] >= THRESHOLD { 255 } else { 0 };
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a small test image with a gradient pattern.
    fn create_gradient_image(width: u32, height: u32) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let val = ((x + y) * 255 / (width + height - 2)) as u8;
                img.put_pixel(x, y, image::Luma([val]));
            }
        }
        img
    }

    fn assert_binary(img: &GrayImage) {
        for (x, y, p) in img.enumerate_pixels() {
            let val = p.0[0];
            assert!(
                val == 0 || val == 255,
                "Pixel ({x}, {y}) = {val}, expected 0 or 255"
            );
        }
    }

    #[test]
    fn test_all_modes_output_binary_and_keep_dimensions() {
        let img = create_gradient_image(17, 9);
        for mode in DitherMode::CYCLE {
            let result = reduce(&img, mode);
            assert_eq!(result.dimensions(), (17, 9), "{mode}");
            assert_binary(&result);
        }
    }

    #[test]
    fn test_floyd_steinberg_all_white_and_black() {
        let white = GrayImage::from_pixel(4, 4, image::Luma([255]));
        assert!(floyd_steinberg_dither(&white).pixels().all(|p| p.0[0] == 255));

        let black = GrayImage::from_pixel(4, 4, image::Luma([0]));
        assert!(floyd_steinberg_dither(&black).pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_floyd_steinberg_known_3x3() {
        let mut img = GrayImage::new(3, 3);
        let pixels: [[u8; 3]; 3] = [[100, 150, 200], [50, 127, 250], [0, 80, 160]];
        for (y, row) in pixels.iter().enumerate() {
            for (x, &val) in row.iter().enumerate() {
                img.put_pixel(x as u32, y as u32, image::Luma([val]));
            }
        }

        let result = floyd_steinberg_dither(&img);

        // Row 0: 100 -> 0 (err 100); 150 + 700/16 = 193 -> 255 (err -62);
        //        200 + -434/16 = 173 -> 255 (err -82).
        // Row 1: 50 + (3*-62 + 5*100)/16 = 69 -> 0 (err 69); ...
        let expected: [[u8; 3]; 3] = [[0, 255, 255], [0, 0, 255], [0, 255, 0]];
        assert_binary_rows(&result, &expected);
    }

    fn assert_binary_rows<const W: usize, const H: usize>(result: &GrayImage, expected: &[[u8; W]; H]) {
        for (y, row) in expected.iter().enumerate() {
            for (x, &val) in row.iter().enumerate() {
                assert_eq!(
                    result.get_pixel(x as u32, y as u32).0[0],
                    val,
                    "pixel ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn test_floyd_steinberg_mid_gray_starts_black() {
        // 128 is not above the threshold; its error 128*7/16 = 56 lifts the
        // neighbour to 184 -> white.
        let img = GrayImage::from_pixel(2, 1, image::Luma([128]));
        let result = floyd_steinberg_dither(&img);
        assert_eq!(result.get_pixel(0, 0).0[0], 0);
        assert_eq!(result.get_pixel(1, 0).0[0], 255);

        let single = GrayImage::from_pixel(1, 1, image::Luma([128]));
        assert_eq!(floyd_steinberg_dither(&single).get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_floyd_steinberg_clips_before_diffusing() {
        // 250 + 840/16 = 302 clips to 255, so no error reaches the third pixel.
        let mut img = GrayImage::new(3, 1);
        for (x, v) in [120u8, 250, 120].into_iter().enumerate() {
            img.put_pixel(x as u32, 0, image::Luma([v]));
        }
        let result = floyd_steinberg_dither(&img);
        assert_binary_rows(&result, &[[0, 255, 0]]);
    }

    #[test]
    fn test_floyd_steinberg_gradient_reference() {
        let img = create_gradient_image(8, 6);
        let result = floyd_steinberg_dither(&img);
        let expected: [[u8; 8]; 6] = [
            [0, 0, 0, 0, 0, 255, 0, 255],
            [0, 0, 0, 255, 0, 255, 0, 255],
            [0, 255, 0, 255, 0, 255, 255, 255],
            [0, 0, 255, 0, 255, 0, 255, 255],
            [0, 255, 0, 255, 255, 255, 255, 255],
            [0, 255, 0, 255, 0, 255, 255, 255],
        ];
        assert_binary_rows(&result, &expected);
    }

    #[test]
    fn test_floyd_steinberg_preserves_average_density() {
        let img = GrayImage::from_pixel(64, 64, image::Luma([64]));
        let result = floyd_steinberg_dither(&img);
        let white = result.pixels().filter(|p| p.0[0] == 255).count();
        // a quarter of the pixels, within a small tolerance
        assert!((850..=1200).contains(&white), "white = {white}");
    }

    #[test]
    fn test_floyd_steinberg_mid_gray_is_half_white() {
        let img = GrayImage::from_pixel(128, 128, image::Luma([128]));
        let result = floyd_steinberg_dither(&img);
        let white = result.pixels().filter(|p| p.0[0] == 255).count() as f64;
        let fraction = white / f64::from(128u32 * 128);
        assert!((0.45..=0.55).contains(&fraction), "fraction = {fraction}");
    }

    #[test]
    fn test_threshold_convert_basic() {
        let mut img = GrayImage::new(4, 1);
        img.put_pixel(0, 0, image::Luma([0]));
        img.put_pixel(1, 0, image::Luma([127]));
        img.put_pixel(2, 0, image::Luma([128]));
        img.put_pixel(3, 0, image::Luma([255]));

        let result = threshold_convert(&img);

        assert_eq!(result.get_pixel(0, 0).0[0], 0);
        assert_eq!(result.get_pixel(1, 0).0[0], 0);
        assert_eq!(result.get_pixel(2, 0).0[0], 255);
        assert_eq!(result.get_pixel(3, 0).0[0], 255);
    }

    #[test]
    fn test_ordered_threshold_is_strict() {
        // matrix[0][0] = 0 -> threshold 2.0; matrix[0][1] = 48 -> threshold 194.0
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, image::Luma([2]));
        img.put_pixel(1, 0, image::Luma([195]));
        let result = ordered_dither(&img);
        assert_eq!(result.get_pixel(0, 0).0[0], 0);
        assert_eq!(result.get_pixel(1, 0).0[0], 255);

        let mut img = GrayImage::new(1, 1);
        img.put_pixel(0, 0, image::Luma([3]));
        assert_eq!(ordered_dither(&img).get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_ordered_matches_serial_reference() {
        let img = create_gradient_image(37, 23);
        let result = ordered_dither(&img);
        for (x, y, p) in img.enumerate_pixels() {
            let m = f32::from(BAYER_8X8[y as usize % 8][x as usize % 8]);
            let expected = if f32::from(p.0[0]) > (m + 0.5) * 4.0 { 255 } else { 0 };
            assert_eq!(result.get_pixel(x, y).0[0], expected);
        }
    }

    #[test]
    fn test_ordered_white_and_black_extremes() {
        let white = GrayImage::from_pixel(8, 8, image::Luma([255]));
        assert!(ordered_dither(&white).pixels().all(|p| p.0[0] == 255));
        let black = GrayImage::from_pixel(8, 8, image::Luma([0]));
        assert!(ordered_dither(&black).pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_reduce_is_deterministic() {
        let img = create_gradient_image(31, 11);
        for mode in DitherMode::CYCLE {
            assert_eq!(reduce(&img, mode), reduce(&img, mode));
        }
    }
}
