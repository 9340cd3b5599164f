//! Encoders for bilevel rasters with embedded resolution.
//!
//! Input images are expected to hold only 0 and 255; anything at or above 128
//! is written as white.

use std::io::Cursor;

use image::GrayImage;
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use tiff::encoder::{Rational, TiffEncoder};
use tiff::tags::{CompressionMethod, PhotometricInterpretation, ResolutionUnit, Tag};
use tracing::debug;

use crate::error::{RenderError, Result};
use crate::params::OutputFormat;

const INCHES_PER_METRE: f64 = 1.0 / 0.0254;
const BMP_FILE_HEADER_LEN: u32 = 14;
const BMP_INFO_HEADER_LEN: u32 = 40;
const BMP_PALETTE_LEN: u32 = 8;

/// Resolution in pixels per metre, as used by BMP and PNG.
pub fn pixels_per_metre(dpi: u32) -> u32 {
    (f64::from(dpi) * INCHES_PER_METRE).round() as u32
}

/// Encode a bilevel image in `format` at `dpi`.
pub fn encode(img: &GrayImage, format: OutputFormat, dpi: u32, jpeg_quality: u8) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    debug!(width, height, dpi, format = format.code(), "Encoding output");
    match format {
        OutputFormat::Bitmap => encode_bmp(img, dpi),
        OutputFormat::Png => encode_png(img, dpi),
        OutputFormat::Tiff => encode_tiff(img, dpi),
        OutputFormat::Jpeg => encode_jpeg(img, jpeg_quality, Some(dpi)),
    }
}

/// Pack one row MSB-first, 1 = white, zero padded to `row_bytes`.
fn pack_row(row: &[u8], row_bytes: usize, out: &mut Vec<u8>) {
    let start = out.len();
    out.resize(start + row_bytes, 0);
    for (x, &v) in row.iter().enumerate() {
        if v >= 128 {
            out[start + x / 8] |= 0x80 >> (x % 8);
        }
    }
}

fn pixel_rows<'a>(img: &'a GrayImage) -> impl DoubleEndedIterator<Item = &'a [u8]> {
    let w = img.width() as usize;
    img.as_raw().chunks_exact(w.max(1))
}

/// Top-down packed rows with each row padded to a byte.
fn pack_bilevel(img: &GrayImage) -> Vec<u8> {
    let row_bytes = (img.width() as usize).div_ceil(8);
    let mut out = Vec::with_capacity(row_bytes * img.height() as usize);
    for row in pixel_rows(img) {
        pack_row(row, row_bytes, &mut out);
    }
    out
}

/// 1 bpp Windows bitmap, bottom-up, palette `[black, white]`.
pub fn encode_bmp(img: &GrayImage, dpi: u32) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let row_bytes = (width as usize).div_ceil(32) * 4;
    let image_size = u32::try_from(row_bytes * height as usize)
        .map_err(|_| RenderError::encode("bmp", "image too large"))?;
    let offset = BMP_FILE_HEADER_LEN + BMP_INFO_HEADER_LEN + BMP_PALETTE_LEN;
    let file_size = offset + image_size;
    let ppm = pixels_per_metre(dpi);
    let signed = |v: u32| i32::try_from(v).map_err(|_| RenderError::encode("bmp", "dimension overflow"));

    let mut out = Vec::with_capacity(file_size as usize);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());

    out.extend_from_slice(&BMP_INFO_HEADER_LEN.to_le_bytes());
    out.extend_from_slice(&signed(width)?.to_le_bytes());
    out.extend_from_slice(&signed(height)?.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // planes
    out.extend_from_slice(&1u16.to_le_bytes()); // bits per pixel
    out.extend_from_slice(&0u32.to_le_bytes()); // BI_RGB
    out.extend_from_slice(&image_size.to_le_bytes());
    out.extend_from_slice(&ppm.to_le_bytes());
    out.extend_from_slice(&ppm.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes()); // colours used
    out.extend_from_slice(&2u32.to_le_bytes()); // important colours

    out.extend_from_slice(&[0, 0, 0, 0]);
    out.extend_from_slice(&[255, 255, 255, 0]);

    if width > 0 {
        for row in pixel_rows(img).rev() {
            pack_row(row, row_bytes, &mut out);
        }
    }
    Ok(out)
}

/// 1-bit grayscale PNG with a `pHYs` chunk.
pub fn encode_png(img: &GrayImage, dpi: u32) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let ppm = pixels_per_metre(dpi);
    let data = pack_bilevel(img);

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::One);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder
            .write_header()
            .map_err(|e| RenderError::encode("png", e))?;
        writer
            .write_image_data(&data)
            .map_err(|e| RenderError::encode("png", e))?;
        writer.finish().map_err(|e| RenderError::encode("png", e))?;
    }
    Ok(out)
}

/// Baseline bilevel TIFF: uncompressed, one strip, resolution in inches.
pub fn encode_tiff(img: &GrayImage, dpi: u32) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let data = pack_bilevel(img);
    let err = |e: tiff::TiffError| RenderError::encode("tiff", e);
    let byte_count =
        u32::try_from(data.len()).map_err(|_| RenderError::encode("tiff", "image too large"))?;

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut tiff = TiffEncoder::new(&mut cursor).map_err(err)?;
        let mut dir = tiff.new_directory().map_err(err)?;
        let strip_offset = dir.write_data(&data[..]).map_err(err)?;
        let strip_offset = u32::try_from(strip_offset)
            .map_err(|_| RenderError::encode("tiff", "strip offset overflow"))?;

        dir.write_tag(Tag::ImageWidth, width).map_err(err)?;
        dir.write_tag(Tag::ImageLength, height).map_err(err)?;
        dir.write_tag(Tag::BitsPerSample, 1u16).map_err(err)?;
        dir.write_tag(Tag::Compression, CompressionMethod::None.to_u16())
            .map_err(err)?;
        dir.write_tag(
            Tag::PhotometricInterpretation,
            PhotometricInterpretation::BlackIsZero.to_u16(),
        )
        .map_err(err)?;
        dir.write_tag(Tag::StripOffsets, strip_offset).map_err(err)?;
        dir.write_tag(Tag::SamplesPerPixel, 1u16).map_err(err)?;
        dir.write_tag(Tag::RowsPerStrip, height).map_err(err)?;
        dir.write_tag(Tag::StripByteCounts, byte_count).map_err(err)?;
        dir.write_tag(Tag::XResolution, Rational { n: dpi, d: 1 })
            .map_err(err)?;
        dir.write_tag(Tag::YResolution, Rational { n: dpi, d: 1 })
            .map_err(err)?;
        dir.write_tag(Tag::ResolutionUnit, ResolutionUnit::Inch.to_u16())
            .map_err(err)?;
        dir.finish().map_err(err)?;
    }
    Ok(cursor.into_inner())
}

/// 8-bit grayscale JPEG. With `dpi` set the JFIF density is written in dots
/// per inch.
pub fn encode_jpeg(img: &GrayImage, quality: u8, dpi: Option<u32>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        if let Some(dpi) = dpi {
            let density =
                u16::try_from(dpi).map_err(|_| RenderError::encode("jpeg", "dpi out of range"))?;
            encoder.set_pixel_density(PixelDensity::dpi(density));
        }
        encoder
            .encode_image(img)
            .map_err(|e| RenderError::encode("jpeg", e))?;
    }
    Ok(out)
}
