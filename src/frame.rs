// 🖼️ Frame decoding - transport payload → pixels

use crate::error::{Result, TollError};
use base64::{engine::general_purpose, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Longest side handed to the recognizer
pub const DEFAULT_MAX_DIM: u32 = 640;

/// Decode a data URI (`data:image/png;base64,...`) or bare base64 into an image
pub fn decode_payload(payload: &str) -> Result<DynamicImage> {
    let encoded = match payload.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        Some(_) => {
            return Err(TollError::MalformedInput(
                "payload has a comma but no data URI header".to_string(),
            ))
        }
        None => payload,
    };

    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| TollError::MalformedInput(format!("invalid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(TollError::MalformedInput("empty image payload".to_string()));
    }

    image::load_from_memory(&bytes)
        .map_err(|e| TollError::MalformedInput(format!("not an image: {}", e)))
}

/// Shrink so the longest side is at most `max_dim`, keeping aspect ratio
pub fn downscale(image: DynamicImage, max_dim: u32) -> DynamicImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);

    if max_dim == 0 || longest <= max_dim {
        return image;
    }

    let scale = max_dim as f64 / longest as f64;
    let new_w = ((w as f64 * scale) as u32).max(1);
    let new_h = ((h as f64 * scale) as u32).max(1);

    image.resize_exact(new_w, new_h, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    fn png_base64(w: u32, h: u32) -> String {
        let mut buf = Vec::new();
        DynamicImage::new_rgb8(w, h)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        general_purpose::STANDARD.encode(&buf)
    }

    #[test]
    fn test_decode_data_uri() {
        let payload = format!("data:image/png;base64,{}", png_base64(8, 4));
        let image = decode_payload(&payload).unwrap();
        assert_eq!(image.dimensions(), (8, 4));
    }

    #[test]
    fn test_decode_bare_base64() {
        let image = decode_payload(&png_base64(3, 3)).unwrap();
        assert_eq!(image.dimensions(), (3, 3));
    }

    #[test]
    fn test_malformed_payloads() {
        for payload in [
            "data:image/png;base64,!!!not-base64!!!",
            "data:image/png;base64,",
            "aGVsbG8gd29ybGQ=", // "hello world", valid base64 but not an image
            "image/png,abc",
        ] {
            let err = decode_payload(payload).unwrap_err();
            assert!(matches!(err, TollError::MalformedInput(_)), "payload {:?}", payload);
        }
    }

    #[test]
    fn test_downscale_keeps_aspect() {
        let image = DynamicImage::new_rgb8(1280, 640);
        let scaled = downscale(image, DEFAULT_MAX_DIM);
        assert_eq!(scaled.dimensions(), (640, 320));
    }

    #[test]
    fn test_small_frames_untouched() {
        let image = DynamicImage::new_rgb8(320, 200);
        let scaled = downscale(image, DEFAULT_MAX_DIM);
        assert_eq!(scaled.dimensions(), (320, 200));
    }
}
