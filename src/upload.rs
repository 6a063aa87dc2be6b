//! Multipart file intake and avatar transcoding.

use actix_multipart::Multipart;
use futures::{StreamExt, TryStreamExt};
use image::imageops::FilterType;
use image::ImageFormat;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::Cursor;

use crate::error::AppError;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 1_000_000;

/// Edge length of a stored avatar, in pixels.
pub const AVATAR_SIZE: u32 = 250;

lazy_static! {
    static ref IMAGE_EXTENSION: Regex = Regex::new(r"(?i)\.(jpg|jpeg|png)$").unwrap();
    static ref DOCUMENT_EXTENSION: Regex = Regex::new(r"(?i)\.(doc|docx)$").unwrap();
}

/// What an upload endpoint accepts.
pub struct UploadPolicy {
    allowed: &'static Regex,
    rejection: &'static str,
    max_bytes: usize,
}

impl UploadPolicy {
    pub fn avatar() -> Self {
        Self {
            allowed: &IMAGE_EXTENSION,
            rejection: "Please upload an image of extension jpg, jpeg, png",
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }

    pub fn document() -> Self {
        Self {
            allowed: &DOCUMENT_EXTENSION,
            rejection: "Please upload a word document",
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }

    pub fn check_filename(&self, filename: &str) -> Result<(), AppError> {
        if self.allowed.is_match(filename) {
            Ok(())
        } else {
            Err(AppError::UploadRejected(self.rejection.to_string()))
        }
    }

    pub fn check_size(&self, len: usize) -> Result<(), AppError> {
        if len > self.max_bytes {
            Err(AppError::UploadRejected("File too large".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Reads the file sent under `field_name`.
///
/// The filename is checked before any content is read, and reading stops as
/// soon as the size limit is exceeded. Other fields are skipped.
pub async fn read_upload(
    mut payload: Multipart,
    field_name: &str,
    policy: &UploadPolicy,
) -> Result<UploadedFile, AppError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(field_name) {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
            .ok_or_else(|| AppError::UploadRejected(format!("Field '{}' must be a file", field_name)))?;
        policy.check_filename(&filename)?;

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            policy.check_size(data.len() + chunk.len())?;
            data.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile { filename, data });
    }

    Err(AppError::UploadRejected(format!("Please upload a file in field '{}'", field_name)))
}

/// Image conversion port used for avatars.
pub trait ImageTranscoder: Send + Sync {
    fn to_avatar(&self, data: &[u8]) -> Result<Vec<u8>, AppError>;
}

/// Crops to a square of `size` pixels and encodes as PNG.
#[derive(Debug, Clone, Copy)]
pub struct PngTranscoder {
    size: u32,
}

impl Default for PngTranscoder {
    fn default() -> Self {
        Self { size: AVATAR_SIZE }
    }
}

impl ImageTranscoder for PngTranscoder {
    fn to_avatar(&self, data: &[u8]) -> Result<Vec<u8>, AppError> {
        let img = image::load_from_memory(data)?;
        let resized = img.resize_to_fill(self.size, self.size, FilterType::Triangle);

        let mut cursor = Cursor::new(Vec::new());
        resized.write_to(&mut cursor, ImageFormat::Png)?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Jpeg).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_avatar_extensions() {
        let policy = UploadPolicy::avatar();
        assert!(policy.check_filename("me.png").is_ok());
        assert!(policy.check_filename("me.JPEG").is_ok());
        assert!(policy.check_filename("me.jpg").is_ok());
        assert!(policy.check_filename("me.gif").is_err());
        assert!(policy.check_filename("me.png.exe").is_err());
        assert!(policy.check_filename("png").is_err());
    }

    #[test]
    fn test_document_extensions() {
        let policy = UploadPolicy::document();
        assert!(policy.check_filename("cv.docx").is_ok());
        assert!(policy.check_filename("cv.doc").is_ok());
        assert!(matches!(
            policy.check_filename("cv.pdf"),
            Err(AppError::UploadRejected(msg)) if msg == "Please upload a word document"
        ));
    }

    #[test]
    fn test_size_limit() {
        let policy = UploadPolicy::avatar();
        assert!(policy.check_size(MAX_UPLOAD_BYTES).is_ok());
        assert!(policy.check_size(MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn test_transcoder_outputs_square_png() {
        let png = PngTranscoder::default().to_avatar(&jpeg_bytes(640, 360)).unwrap();

        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (AVATAR_SIZE, AVATAR_SIZE));
    }

    #[test]
    fn test_transcoder_rejects_garbage() {
        assert!(matches!(
            PngTranscoder::default().to_avatar(b"definitely not an image"),
            Err(AppError::UploadRejected(_))
        ));
    }
}
