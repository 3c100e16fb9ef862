//! Media payload checks shared by the view tree and file saves.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Sniff the format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Decode a base64 image payload. Whitespace inside the payload is ignored
/// and a `data:` URI prefix is stripped.
pub fn decode_image(payload: &str) -> Result<DecodedImage, String> {
    let trimmed = payload.trim();
    let body = match (trimmed.starts_with("data:"), trimmed.find(',')) {
        (true, Some(comma)) => &trimmed[comma + 1..],
        _ => trimmed,
    };
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err("image payload is empty".to_string());
    }

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("invalid base64: {}", e))?;
    let format = ImageFormat::sniff(&bytes).ok_or_else(|| "unrecognized image format".to_string())?;
    Ok(DecodedImage { format, bytes })
}

/// Accept only absolute http(s) URLs.
pub fn check_video_url(text: &str) -> Result<Url, String> {
    let url = Url::parse(text.trim()).map_err(|e| format!("invalid video URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported URL scheme '{}'", other)),
    }
}
