use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

use super::{ProviderError, ProviderResult};

/// Recolor every pixel of a sprite to black, keeping its alpha, and re-encode as PNG.
pub fn blackout_png(bytes: &[u8]) -> ProviderResult<Vec<u8>> {
    let mut img: RgbaImage = image::load_from_memory(bytes)
        .map_err(|e| ProviderError::Payload(format!("Failed to decode sprite: {}", e)))?
        .to_rgba8();

    for pixel in img.pixels_mut() {
        pixel.0[0] = 0;
        pixel.0[1] = 0;
        pixel.0[2] = 0;
    }

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ProviderError::Payload(format!("Failed to encode silhouette: {}", e)))?;
    Ok(out.into_inner())
}
