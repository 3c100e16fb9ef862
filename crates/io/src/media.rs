//! Direct media saves. Images are written as decoded bytes; they do not go
//! through the PDF or Excel engines.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

pub use statdeck_core::media::{check_video_url, decode_image, DecodedImage, ImageFormat};

/// `chat-image-2024-06-15.png`
pub fn image_filename(format: ImageFormat, date: NaiveDate) -> String {
    format!("chat-image-{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// Decode a base64 image payload and write it to `path`.
pub fn save_image(payload: &str, path: &Path) -> Result<DecodedImage, String> {
    let image = decode_image(payload)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    fs::write(path, &image.bytes).map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    log::debug!("saved {} image ({} bytes) to {}", image.format.extension(), image.bytes.len(), path.display());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_save_image_writes_decoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("pixel.png");
        let image = save_image(PIXEL_PNG, &path).unwrap();
        let written = fs::read(&path).unwrap();
        assert_eq!(written, image.bytes);
        assert!(written.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_save_invalid_payload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        assert!(save_image("%%%", &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_image_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(image_filename(ImageFormat::Jpeg, date), "chat-image-2024-06-15.jpg");
    }
}
