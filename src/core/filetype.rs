//! File type classification and filename sanitizing
//!
//! Used both when mirroring replied media and when `.link` downloads an
//! arbitrary URL: picks the Telegram send method, the MIME type announced to
//! upload hosts and a filesystem-safe name for temp files.

use std::fmt;

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "3gp", "mpg", "mpeg", "ts", "vob", "ogv", "rm", "rmvb",
    "asf", "divx", "f4v", "mts", "m2ts", "mxf", "qt", "xvid",
];

const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif", "svg", "ico", "heic", "heif",
];

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg", "wma", "m4a", "opus", "aiff"];

/// Extensions that make `sanitize_filename` keep the name as a video.
const SANITIZED_VIDEO_SUFFIXES: &[&str] = &[".mp4", ".mkv", ".avi", ".mov", ".flv", ".wmv"];

const MAX_FILENAME_LEN: usize = 255;

/// Display category of a file, drives the Telegram send method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Video,
    Photo,
    Audio,
    Document,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Photo => "photo",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased extension of a filename or URL, without query or fragment.
///
/// Returns `None` when the last path segment has no dot or ends with one.
pub fn extension(name_or_url: &str) -> Option<String> {
    let without_query = name_or_url.split(['?', '#']).next().unwrap_or_default();
    let last_segment = without_query.rsplit('/').next().unwrap_or_default();
    let (_, ext) = last_segment.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classifies a filename or URL by extension.
///
/// Total: anything without a known extension is a `Document`.
///
/// ```
/// use upmirror::core::filetype::{classify, FileCategory};
///
/// assert_eq!(classify("clip.MKV"), FileCategory::Video);
/// assert_eq!(classify("https://cdn.example.com/a/cover.jpg?x=1"), FileCategory::Photo);
/// assert_eq!(classify("README"), FileCategory::Document);
/// ```
pub fn classify(name_or_url: &str) -> FileCategory {
    let Some(ext) = extension(name_or_url) else {
        return FileCategory::Document;
    };
    let ext = ext.as_str();
    if VIDEO_EXTENSIONS.contains(&ext) {
        FileCategory::Video
    } else if PHOTO_EXTENSIONS.contains(&ext) {
        FileCategory::Photo
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        FileCategory::Audio
    } else {
        FileCategory::Document
    }
}

/// Makes a filename safe for the local filesystem.
///
/// Strips the query string, keeps only `[A-Za-z0-9 _-.]`, caps the length at
/// 255 characters and appends `.mp4` when the name does not end with a known
/// video container (untyped downloads are assumed to be videos). Applying it
/// twice gives the same result as applying it once.
///
/// ```
/// use upmirror::core::filetype::sanitize_filename;
///
/// assert_eq!(sanitize_filename("my video (1).mkv?token=abc"), "my video 1.mkv");
/// assert_eq!(sanitize_filename("stream"), "stream.mp4");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let without_query = name.split('?').next().unwrap_or_default();
    let filtered: String = without_query
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.'))
        .collect();

    let lower = filtered.to_ascii_lowercase();
    if let Some(suffix) = SANITIZED_VIDEO_SUFFIXES.iter().find(|s| lower.ends_with(*s)) {
        if filtered.len() <= MAX_FILENAME_LEN {
            return filtered;
        }
        let stem_len = MAX_FILENAME_LEN - suffix.len();
        let stem = &filtered[..stem_len];
        let ext = &filtered[filtered.len() - suffix.len()..];
        return format!("{}{}", stem, ext);
    }

    let stem = if filtered.is_empty() { "download" } else { filtered.as_str() };
    let max_stem = MAX_FILENAME_LEN - ".mp4".len();
    let stem = if stem.len() > max_stem { &stem[..max_stem] } else { stem };
    format!("{}.mp4", stem)
}

/// MIME type announced to upload hosts.
pub fn mime_for_filename(name: &str) -> &'static str {
    let Some(ext) = extension(name) else {
        return "application/octet-stream";
    };
    match ext.as_str() {
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        "m4v" => "video/x-m4v",
        "3gp" => "video/3gpp",
        "mpg" | "mpeg" => "video/mpeg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "ogg" => "audio/ogg",
        "wma" => "audio/x-ms-wma",
        "m4a" => "audio/mp4",
        "opus" => "audio/opus",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// File extension for a MIME type, the reverse of [`mime_for_filename`].
///
/// Parameters such as `; codecs=...` are ignored.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    let ext = match essence.as_str() {
        "video/mp4" => "mp4",
        "video/x-msvideo" | "video/avi" => "avi",
        "video/x-matroska" => "mkv",
        "video/quicktime" => "mov",
        "video/x-ms-wmv" => "wmv",
        "video/x-flv" => "flv",
        "video/webm" => "webm",
        "video/x-m4v" => "m4v",
        "video/3gpp" => "3gp",
        "video/mpeg" => "mpg",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/flac" | "audio/x-flac" => "flac",
        "audio/aac" => "aac",
        "audio/ogg" => "ogg",
        "audio/x-ms-wma" => "wma",
        "audio/mp4" | "audio/x-m4a" => "m4a",
        "audio/opus" => "opus",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => return None,
    };
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_each_set() {
        for ext in VIDEO_EXTENSIONS {
            assert_eq!(classify(&format!("a.{}", ext)), FileCategory::Video, "{}", ext);
        }
        for ext in PHOTO_EXTENSIONS {
            assert_eq!(classify(&format!("a.{}", ext)), FileCategory::Photo, "{}", ext);
        }
        for ext in AUDIO_EXTENSIONS {
            assert_eq!(classify(&format!("a.{}", ext)), FileCategory::Audio, "{}", ext);
        }
    }

    #[test]
    fn test_classify_defaults_to_document() {
        assert_eq!(classify("archive.zip"), FileCategory::Document);
        assert_eq!(classify("noext"), FileCategory::Document);
        assert_eq!(classify("trailing."), FileCategory::Document);
        assert_eq!(classify("https://example.com/"), FileCategory::Document);
        assert_eq!(classify("https://example.com/v1.2/download"), FileCategory::Document);
    }

    #[test]
    fn test_classify_is_case_insensitive_and_ignores_query() {
        assert_eq!(classify("SONG.MP3"), FileCategory::Audio);
        assert_eq!(classify("https://x.io/a.mp4?sig=1.png#t=3"), FileCategory::Video);
    }

    #[test]
    fn test_sanitize_strips_and_appends() {
        assert_eq!(sanitize_filename("a/b\\c:d.mov"), "abcd.mov");
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf.mp4");
        assert_eq!(sanitize_filename("файл.mkv"), ".mkv");
        assert_eq!(sanitize_filename("???"), "download.mp4");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = format!("{}.mkv", "a".repeat(400));
        let out = sanitize_filename(&long);
        assert_eq!(out.len(), 255);
        assert!(out.ends_with(".mkv"));

        let long_untyped = "b".repeat(400);
        let out = sanitize_filename(&long_untyped);
        assert_eq!(out.len(), 255);
        assert!(out.ends_with(".mp4"));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "",
            "video.MP4",
            "clip.webm",
            "weird name!!.avi?x=1",
            "../../etc/passwd",
            "ends.with.dot.",
            &"c".repeat(300),
            &format!("{}.wmv", "d".repeat(300)),
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once, "input: {}", input);
        }
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("video/mp4"), Some("mp4"));
        assert_eq!(extension_for_mime("Video/X-Matroska"), Some("mkv"));
        assert_eq!(extension_for_mime("audio/mp4; codecs=mp4a.40.2"), Some("m4a"));
        assert_eq!(extension_for_mime("application/zip"), None);
        assert_eq!(extension_for_mime(""), None);
        for ext in ["mp4", "mkv", "mov", "mp3", "jpg"] {
            let mime = mime_for_filename(&format!("a.{}", ext));
            assert_eq!(extension_for_mime(mime), Some(ext));
        }
    }

    #[test]
    fn test_mime_table() {
        assert_eq!(mime_for_filename("a.mkv"), "video/x-matroska");
        assert_eq!(mime_for_filename("a.M4A"), "audio/mp4");
        assert_eq!(mime_for_filename("a"), "application/octet-stream");
        assert_eq!(mime_for_filename("a.xyz"), "application/octet-stream");
    }
}
