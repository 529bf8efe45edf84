//! Image handling at the session boundary
//!
//! Compression is an external collaborator consumed behind [`ImageCodec`];
//! the data-URL plumbing lives here because history entries own their
//! photo as a data-URI string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;
use tracing::debug;

/// Errors from image processing
///
/// Recoverable by design: the caller rolls the selection back and the
/// session continues as if no image were chosen.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Compression failed: {0}")]
    Compression(String),

    #[error("Not a data URL")]
    NotADataUrl,

    #[error("Unsupported data URL encoding (expected base64)")]
    UnsupportedEncoding,

    #[error("Invalid base64 payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
}

/// An image as it moves through the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Compression options forwarded to the codec
#[derive(Debug, Clone, Copy)]
pub struct CompressOptions {
    pub max_size_mb: f64,
    pub max_dimension: u32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_size_mb: 1.0,
            max_dimension: 1024,
        }
    }
}

/// External image compression collaborator
pub trait ImageCodec: Send + Sync {
    /// Produce a smaller rendition of `image` within `opts` bounds
    fn compress(&self, image: &ImageFile, opts: &CompressOptions) -> Result<ImageFile, ImageError>;
}

/// Codec that hands the image through untouched
///
/// Stands in where no native compressor is wired up; the provider accepts
/// originals, they are just heavier to persist.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCodec;

impl ImageCodec for PassthroughCodec {
    fn compress(&self, image: &ImageFile, _opts: &CompressOptions) -> Result<ImageFile, ImageError> {
        debug!(name = %image.name, size = image.bytes.len(), "compress: passthrough");
        Ok(image.clone())
    }
}

/// Encode an image as a `data:` URL for persistence
pub fn to_data_url(image: &ImageFile) -> String {
    format!("data:{};base64,{}", image.mime_type, BASE64.encode(&image.bytes))
}

/// Decode a persisted `data:` URL back into an image
pub fn from_data_url(url: &str, name: impl Into<String>) -> Result<ImageFile, ImageError> {
    let rest = url.strip_prefix("data:").ok_or(ImageError::NotADataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageError::NotADataUrl)?;

    let mime_type = match header.strip_suffix(";base64") {
        Some(mime) => mime,
        None => return Err(ImageError::UnsupportedEncoding),
    };

    Ok(ImageFile {
        name: name.into(),
        mime_type: mime_type.to_string(),
        bytes: BASE64.decode(payload)?,
    })
}

/// The base64 payload alone, as the provider's inline-image part wants it
pub fn to_base64(image: &ImageFile) -> String {
    BASE64.encode(&image.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImageFile {
        ImageFile {
            name: "plate.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF, 0x00, 0x42],
        }
    }

    #[test]
    fn test_data_url_roundtrip() {
        let image = sample();
        let url = to_data_url(&image);

        assert!(url.starts_with("data:image/jpeg;base64,"));

        let back = from_data_url(&url, "restored.jpg").unwrap();
        assert_eq!(back.mime_type, image.mime_type);
        assert_eq!(back.bytes, image.bytes);
        assert_eq!(back.name, "restored.jpg");
    }

    #[test]
    fn test_from_data_url_rejects_plain_url() {
        assert!(matches!(
            from_data_url("https://example.com/a.jpg", "a"),
            Err(ImageError::NotADataUrl)
        ));
    }

    #[test]
    fn test_from_data_url_rejects_non_base64_encoding() {
        assert!(matches!(
            from_data_url("data:text/plain,hello", "a"),
            Err(ImageError::UnsupportedEncoding)
        ));
    }

    #[test]
    fn test_from_data_url_rejects_bad_payload() {
        assert!(matches!(
            from_data_url("data:image/png;base64,@@@", "a"),
            Err(ImageError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_passthrough_codec() {
        let image = sample();
        let out = PassthroughCodec
            .compress(&image, &CompressOptions::default())
            .unwrap();
        assert_eq!(out, image);
    }
}
