//! PNG encoding of rendered framebuffers.
//!
//! Writes RGBA PNGs (color type 6) with unfiltered scanlines. The
//! framebuffer holds premultiplied pixels, which are converted back to
//! straight alpha before encoding.

use std::io::Write;

use map_common::{MarkerError, MarkerResult};
use tiny_skia::Pixmap;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Encode a premultiplied framebuffer.
pub fn encode_pixmap(pixmap: &Pixmap) -> MarkerResult<Vec<u8>> {
    let mut pixels = Vec::with_capacity(pixmap.data().len());
    for p in pixmap.pixels() {
        let c = p.demultiply();
        pixels.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    encode_rgba(&pixels, pixmap.width() as usize, pixmap.height() as usize)
}

/// Encode straight-alpha RGBA pixel data (4 bytes per pixel).
///
/// # Arguments
///
/// * `pixels` - Row-major RGBA8 data, `width * height * 4` bytes
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Returns
///
/// The PNG file bytes, or `MarkerError::Encode` if the buffer size does not
/// match the dimensions.
pub fn encode_rgba(pixels: &[u8], width: usize, height: usize) -> MarkerResult<Vec<u8>> {
    if pixels.len() != width * height * 4 {
        return Err(MarkerError::Encode(format!(
            "expected {} bytes for {}x{} image, got {}",
            width * height * 4,
            width,
            height,
            pixels.len()
        )));
    }

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(6); // color type (RGBA)
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    let idat_data = deflate_scanlines(pixels, width, height)
        .map_err(|e| MarkerError::Encode(format!("IDAT compression failed: {}", e)))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

fn deflate_scanlines(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let stride = width * 4;
    let mut uncompressed = Vec::with_capacity(height * (1 + stride));
    for row in pixels.chunks_exact(stride.max(1)).take(height) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}
