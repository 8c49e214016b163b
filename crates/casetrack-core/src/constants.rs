//! Fixed catalogs and allow-lists.

/// Advisory crime-type catalog offered to clients. Input is not checked
/// against it.
pub const CRIME_TYPES: &[&str] = &[
    "Robo",
    "Hurto",
    "Asalto",
    "Homicidio",
    "Secuestro",
    "Violación",
    "Narcotráfico",
    "Extorsión",
    "Fraude",
    "Violencia doméstica",
    "Vandalismo",
    "Otro",
];

pub const IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/heic",
    "image/heif",
];

pub const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/webm",
    "video/quicktime",
    "video/x-msvideo",
    "video/3gpp",
];

/// Multipart field names accepted for each media kind.
pub const IMAGE_FIELDS: &[&str] = &["images", "images[]"];
pub const VIDEO_FIELDS: &[&str] = &["videos", "videos[]"];
