use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::DynamicImage;

use crate::constants::DATA_URL_PREFIX;

/// One decoded camera frame, owned by the call that processes it.
#[derive(Debug, Clone)]
pub struct Frame {
    encoded: Vec<u8>,
    image: DynamicImage,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The image bytes as sent by the client (JPEG/PNG/...).
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

/// Transport/format failures; reported inline as `Error: ...`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Decoding Base64 failed - {0}")]
    Base64(String),
    #[error("Invalid frame")]
    InvalidImage,
    #[error("Expected a text frame")]
    NotText,
}

/// Strip an optional `data:<mime>;base64,` header, base64-decode, then decode the image.
pub fn decode_payload(payload: &str) -> Result<Frame, FrameError> {
    let body = if payload.starts_with(DATA_URL_PREFIX) {
        match payload.split_once(',') {
            Some((_, body)) => body,
            None => {
                return Err(FrameError::Base64(
                    "data URL has no ',' before the payload".to_string(),
                ))
            }
        }
    } else {
        payload
    };

    let cleaned: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let encoded = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| FrameError::Base64(e.to_string()))?;

    let image = image::load_from_memory(&encoded).map_err(|_| FrameError::InvalidImage)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(FrameError::InvalidImage);
    }

    Ok(Frame { encoded, image })
}
