//! Turning avatar bytes into self-contained `data:` URLs.

use base64::Engine;

use peoplehub_core::defaults::PHOTO_FALLBACK_MIME;

/// Encode an image body as a `data:` URL a view can dereference directly.
///
/// Returns `None` for an empty body. The MIME type comes from the bytes when
/// they are a recognizable image, then from the response header, then falls
/// back to JPEG.
pub fn photo_data_url(bytes: &[u8], content_type: Option<&str>) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }

    let mime = infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type().to_string())
        .or_else(|| {
            content_type
                .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_string())
                .filter(|ct| ct.starts_with("image/"))
        })
        .unwrap_or_else(|| PHOTO_FALLBACK_MIME.to_string());

    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Some(format!("data:{};base64,{}", mime, encoded))
}
