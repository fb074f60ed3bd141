//! Captured map imagery for the length diagram page.
//!
//! The drawing UI hands over either raw image bytes or a canvas data URL
//! (`data:image/png;base64,...`). Nothing here is fatal to report assembly:
//! a capture that cannot be decoded simply leaves the diagram without an
//! image.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, ImageOutputFormat};
use serde::{Deserialize, Serialize};

use crate::errors::{RoofError, RoofResult};

/// An image as captured by the map front end, not yet validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CapturedImage {
    /// Raw encoded image bytes (base64 in JSON)
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    /// A `data:` URL as produced by `canvas.toDataURL()`
    DataUrl(String),
}

impl CapturedImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        CapturedImage::Bytes(bytes)
    }

    pub fn from_data_url(url: impl Into<String>) -> Self {
        CapturedImage::DataUrl(url.into())
    }

    /// Decode and validate the capture.
    ///
    /// PNG, JPEG and GIF are embedded untouched; any other format the
    /// decoder understands is transcoded to PNG.
    pub fn decode(&self) -> RoofResult<EmbeddedImage> {
        let bytes = match self {
            CapturedImage::Bytes(bytes) => bytes.clone(),
            CapturedImage::DataUrl(url) => decode_data_url(url)?,
        };

        let format = image::guess_format(&bytes)
            .map_err(|e| RoofError::invalid_input("captured_image", "unrecognised", e.to_string()))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| RoofError::invalid_input("captured_image", format!("{:?}", format), e.to_string()))?;

        let (width_px, height_px) = (decoded.width(), decoded.height());
        if width_px == 0 || height_px == 0 {
            return Err(RoofError::invalid_input(
                "captured_image",
                format!("{}x{}", width_px, height_px),
                "Image has no pixels",
            ));
        }

        let (format, data) = match format {
            ImageFormat::Png => (ImageKind::Png, bytes),
            ImageFormat::Jpeg => (ImageKind::Jpeg, bytes),
            ImageFormat::Gif => (ImageKind::Gif, bytes),
            _ => {
                let mut png = Vec::new();
                decoded
                    .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
                    .map_err(|e| RoofError::invalid_input("captured_image", "transcode", e.to_string()))?;
                (ImageKind::Png, png)
            }
        };

        Ok(EmbeddedImage {
            format,
            width_px,
            height_px,
            data,
        })
    }
}

fn decode_data_url(url: &str) -> RoofResult<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| RoofError::invalid_input("captured_image", "data URL", "Missing 'data:' scheme"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| RoofError::invalid_input("captured_image", "data URL", "Missing ',' separator"))?;
    if !header.ends_with(";base64") {
        return Err(RoofError::invalid_input(
            "captured_image",
            header.to_string(),
            "Only base64 data URLs are supported",
        ));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| RoofError::invalid_input("captured_image", "data URL", e.to_string()))
}

/// Image formats the renderer can embed directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
        }
    }
}

/// A decoded, embeddable image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedImage {
    pub format: ImageKind,
    pub width_px: u32,
    pub height_px: u32,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Serialize byte buffers as standard base64 strings
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    pub(crate) fn encoded_image(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([40, 116, 166]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_png_bytes() {
        let png = encoded_image(8, 6, ImageOutputFormat::Png);
        let embedded = CapturedImage::from_bytes(png.clone()).decode().unwrap();
        assert_eq!(embedded.format, ImageKind::Png);
        assert_eq!((embedded.width_px, embedded.height_px), (8, 6));
        assert_eq!(embedded.data, png);
    }

    #[test]
    fn test_decode_data_url() {
        let png = encoded_image(4, 4, ImageOutputFormat::Png);
        let url = format!("data:image/png;base64,{}", STANDARD.encode(&png));
        let embedded = CapturedImage::from_data_url(url).decode().unwrap();
        assert_eq!(embedded.format, ImageKind::Png);
        assert_eq!(embedded.width_px, 4);
    }

    #[test]
    fn test_bmp_is_transcoded_to_png() {
        let bmp = encoded_image(3, 2, ImageOutputFormat::Bmp);
        let embedded = CapturedImage::from_bytes(bmp).decode().unwrap();
        assert_eq!(embedded.format, ImageKind::Png);
        assert!(embedded.data.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_corrupt_bytes_fail() {
        assert!(CapturedImage::from_bytes(b"not an image".to_vec()).decode().is_err());

        // valid PNG signature, truncated body
        let mut png = encoded_image(4, 4, ImageOutputFormat::Png);
        png.truncate(20);
        assert!(CapturedImage::from_bytes(png).decode().is_err());
    }

    #[test]
    fn test_bad_data_urls_fail() {
        assert!(CapturedImage::from_data_url("image/png;base64,AAAA").decode().is_err());
        assert!(CapturedImage::from_data_url("data:image/png,plain").decode().is_err());
        assert!(CapturedImage::from_data_url("data:image/png;base64,@@@").decode().is_err());
    }

    #[test]
    fn test_embedded_image_json_uses_base64() {
        let embedded = EmbeddedImage {
            format: ImageKind::Jpeg,
            width_px: 1,
            height_px: 1,
            data: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&embedded).unwrap();
        assert!(json.contains("\"data\":\"AQID\""));
        assert!(json.contains("\"format\":\"jpeg\""));
        let back: EmbeddedImage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, embedded);
    }
}
