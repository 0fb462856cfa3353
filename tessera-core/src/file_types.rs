//! Mime type tables
//!
//! Maps between mime types, file extensions and broad media kinds. Data
//! providers use the extension to name their backing files; import paths use
//! the reverse lookup to guess a mime type from a source file.

/// Mime types recognised as audio
pub const AUDIO_MIME_TYPES: &[(&str, &str)] = &[
    ("audio/x-wav", "wav"),
    ("audio/wav", "wav"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "ogg"),
    ("audio/flac", "flac"),
    ("audio/aiff", "aiff"),
];

/// Mime types recognised as images
pub const IMAGE_MIME_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/avif", "avif"),
    ("image/svg+xml", "svg"),
];

/// Mime types recognised as video
pub const VIDEO_MIME_TYPES: &[(&str, &str)] = &[
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
    ("video/webm", "webm"),
    ("video/x-matroska", "mkv"),
];

/// Mime types recognised as text
pub const TEXT_MIME_TYPES: &[(&str, &str)] = &[
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("application/xhtml+xml", "xhtml"),
];

/// Fallback for payloads of unknown type
pub const BINARY_MIME_TYPE: &str = "application/octet-stream";

/// Broad media categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Text,
    Image,
}

fn tables() -> [(MediaKind, &'static [(&'static str, &'static str)]); 4] {
    [
        (MediaKind::Audio, AUDIO_MIME_TYPES),
        (MediaKind::Image, IMAGE_MIME_TYPES),
        (MediaKind::Video, VIDEO_MIME_TYPES),
        (MediaKind::Text, TEXT_MIME_TYPES),
    ]
}

/// Media kind of a mime type, `None` if unrecognised
///
/// # Example
/// ```
/// use tessera_core::file_types::{media_kind_of, MediaKind};
///
/// assert_eq!(media_kind_of("audio/x-wav"), Some(MediaKind::Audio));
/// assert_eq!(media_kind_of("IMAGE/PNG"), Some(MediaKind::Image));
/// assert_eq!(media_kind_of("application/zip"), None);
/// ```
pub fn media_kind_of(mime_type: &str) -> Option<MediaKind> {
    let mime = mime_type.to_ascii_lowercase();
    tables()
        .into_iter()
        .find(|(_, table)| table.iter().any(|(m, _)| *m == mime))
        .map(|(kind, _)| kind)
}

/// File extension for a mime type; unknown types get "bin"
pub fn extension_for(mime_type: &str) -> &'static str {
    let mime = mime_type.to_ascii_lowercase();
    tables()
        .into_iter()
        .flat_map(|(_, table)| table.iter())
        .find(|(m, _)| *m == mime)
        .map(|(_, ext)| *ext)
        .unwrap_or("bin")
}

/// Guess a mime type from a file extension
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let ext = extension.to_ascii_lowercase();
    let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };
    tables()
        .into_iter()
        .flat_map(|(_, table)| table.iter())
        .find(|(_, e)| *e == ext)
        .map(|(mime, _)| *mime)
}
