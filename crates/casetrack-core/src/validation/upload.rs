use crate::constants::{IMAGE_MIME_TYPES, VIDEO_MIME_TYPES};
use crate::models::MediaKind;

const MAX_BASE_NAME_LENGTH: usize = 100;

/// Normalize MIME type by stripping parameters and case
/// (e.g. "Image/JPEG; charset=utf-8" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

/// Compares the normalized MIME type against the allow-list of `kind`.
pub fn is_allowed_mime(kind: MediaKind, content_type: &str) -> bool {
    let normalized = normalize_mime_type(content_type);
    let allowed = match kind {
        MediaKind::Image => IMAGE_MIME_TYPES,
        MediaKind::Video => VIDEO_MIME_TYPES,
    };
    allowed.contains(&normalized.as_str())
}

/// Base name of an uploaded file with every character outside
/// `[A-Za-z0-9_-]` replaced by `_`. Directory components are dropped.
pub fn sanitize_base_name(original_name: &str) -> String {
    let file_name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };

    let sanitized: String = stem
        .chars()
        .take(MAX_BASE_NAME_LENGTH)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

fn extension(original_name: &str) -> Option<String> {
    let file_name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    match file_name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < file_name.len() => {
            let ext = &file_name[idx + 1..];
            ext.chars()
                .all(|c| c.is_ascii_alphanumeric())
                .then(|| ext.to_string())
        }
        _ => None,
    }
}

/// Storage-assigned filename: `{sanitized_base}-{unix_millis}-{nonce}{.ext}`.
pub fn storage_filename(original_name: &str, unix_millis: i64, nonce: u32) -> String {
    let base = sanitize_base_name(original_name);
    match extension(original_name) {
        Some(ext) => format!("{}-{}-{}.{}", base, unix_millis, nonce, ext),
        None => format!("{}-{}-{}", base, unix_millis, nonce),
    }
}
