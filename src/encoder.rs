//! Binary-to-text encoding of uploaded photos.
//!
//! Photos travel to the API as standard base64 alongside a media type
//! label resolved from the file name.

use crate::models::{EncodedImagePart, MediaType, UploadedImage};
use crate::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::future::try_join_all;
use std::path::PathBuf;

/// Media type used when neither the extension nor the content identify
/// the image.
pub const FALLBACK_MEDIA_TYPE: MediaType = MediaType::Jpeg;

/// Map a file name's lower-cased extension to a known media type.
pub fn media_type_for_filename(name: &str) -> Option<MediaType> {
    let (_, extension) = name.rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some(MediaType::Jpeg),
        "png" => Some(MediaType::Png),
        "webp" => Some(MediaType::Webp),
        "gif" => Some(MediaType::Gif),
        _ => None,
    }
}

/// Identify an image from its leading magic bytes.
pub fn sniff_media_type(bytes: &[u8]) -> Option<MediaType> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some(MediaType::Jpeg),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some(MediaType::Png),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some(MediaType::Webp),
        [0x47, 0x49, 0x46, 0x38, ..] => Some(MediaType::Gif),
        _ => None,
    }
}

/// Resolve the media type to send for an upload: extension first, then
/// content sniffing, then [`FALLBACK_MEDIA_TYPE`].
pub fn resolve_media_type(image: &UploadedImage) -> MediaType {
    if let Some(media_type) = image.media_type() {
        return media_type;
    }

    if let Some(media_type) = sniff_media_type(&image.data) {
        tracing::debug!(
            "{} has no recognised extension, detected {} from content",
            image.name,
            media_type.as_str()
        );
        return media_type;
    }

    tracing::warn!(
        "Unrecognized image type for {} (first 4 bytes: {:02X?}), sending as {}",
        image.name,
        &image.data[..image.data.len().min(4)],
        FALLBACK_MEDIA_TYPE.as_str()
    );
    FALLBACK_MEDIA_TYPE
}

pub fn encode_image(image: &UploadedImage) -> EncodedImagePart {
    EncodedImagePart {
        mime_type: resolve_media_type(image).as_str().to_string(),
        data: BASE64.encode(&image.data),
    }
}

/// Encode every upload, preserving upload order.
pub fn encode_all(images: &[UploadedImage]) -> Vec<EncodedImagePart> {
    images.iter().map(encode_image).collect()
}

pub fn decode_part(part: &EncodedImagePart) -> Result<Vec<u8>> {
    BASE64
        .decode(&part.data)
        .map_err(|e| crate::Error::Invariant(format!("Encoded part is not valid base64: {}", e)))
}

/// Read several photos concurrently. Results come back in the order the
/// paths were given; the first unreadable file fails the whole batch.
pub async fn load_all(paths: &[PathBuf]) -> Result<Vec<UploadedImage>> {
    try_join_all(paths.iter().map(|path| UploadedImage::load(path))).await
}
