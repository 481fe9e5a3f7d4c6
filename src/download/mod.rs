//! Getting bytes onto local disk
//!
//! - [`acquirer`] streams Telegram-hosted media to a temp file
//! - [`link`] fetches an arbitrary URL for the `/link` command
//! - [`progress`] turns transfer samples into rate-limited status text

pub mod acquirer;
pub mod link;
pub mod progress;

use std::time::Duration;
use teloxide::types::Message;

use crate::core::filetype::{extension, extension_for_mime};

pub use acquirer::{MediaAcquirer, TelegramAcquirer};
pub use progress::{ProgressReporter, StatusSink};

/// Kind of media a message carries, in lookup priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Video,
    Document,
    Photo,
    Audio,
}

/// Pointer to a media object hosted by Telegram.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaReference {
    pub chat_id: i64,
    pub message_id: i32,
    /// Bot API handle for `getFile`
    pub file_id: String,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub kind: MediaKind,
}

impl MediaReference {
    /// Extracts the media of a message: video, then document, then the
    /// largest photo, then audio. `None` for anything else.
    pub fn from_message(msg: &Message) -> Option<Self> {
        let chat_id = msg.chat.id.0;
        let message_id = msg.id.0;

        let (kind, file_id, file_name, file_size, mime_type) = if let Some(video) = msg.video() {
            (
                MediaKind::Video,
                video.file.id.0.clone(),
                video.file_name.clone(),
                video.file.size,
                video.mime_type.as_ref().map(|m| m.to_string()),
            )
        } else if let Some(doc) = msg.document() {
            (
                MediaKind::Document,
                doc.file.id.0.clone(),
                doc.file_name.clone(),
                doc.file.size,
                doc.mime_type.as_ref().map(|m| m.to_string()),
            )
        } else if let Some(photos) = msg.photo() {
            let photo = photos.iter().max_by_key(|p| p.width * p.height)?;
            (
                MediaKind::Photo,
                photo.file.id.0.clone(),
                None,
                photo.file.size,
                Some("image/jpeg".to_string()),
            )
        } else if let Some(audio) = msg.audio() {
            (
                MediaKind::Audio,
                audio.file.id.0.clone(),
                audio.file_name.clone(),
                audio.file.size,
                audio.mime_type.as_ref().map(|m| m.to_string()),
            )
        } else {
            return None;
        };

        Some(Self {
            chat_id,
            message_id,
            file_id,
            file_name: file_name.filter(|n| !n.trim().is_empty()),
            file_size: Some(u64::from(file_size)).filter(|s| *s > 0),
            mime_type,
            kind,
        })
    }

    /// Name shown to the user and announced to upload hosts.
    ///
    /// A missing extension is taken from the MIME type when it is known, so
    /// `video/mp4` documents are still recognized as videos.
    pub fn display_name(&self) -> String {
        let mime_ext = self.mime_type.as_deref().and_then(extension_for_mime);
        if let Some(name) = &self.file_name {
            return match mime_ext {
                Some(ext) if extension(name).is_none() => format!("{}.{}", name.trim_end_matches('.'), ext),
                _ => name.clone(),
            };
        }
        match self.kind {
            MediaKind::Video => format!("video_{}.mp4", self.message_id),
            MediaKind::Audio => format!("audio_{}.mp3", self.message_id),
            MediaKind::Photo => format!("photo_{}.jpg", self.message_id),
            MediaKind::Document => match mime_ext {
                Some(ext) => format!("file_{}.{}", self.message_id, ext),
                None => format!("file_{}", self.message_id),
            },
        }
    }
}

/// One observation of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub bytes_transferred: u64,
    /// 0 when the size is unknown
    pub bytes_total: u64,
    /// Time since the transfer started
    pub elapsed: Duration,
}

impl ProgressSample {
    /// Whole percent, clamped to 100; 0 when the total is unknown.
    pub fn percent(&self) -> u8 {
        if self.bytes_total == 0 {
            return 0;
        }
        let pct = u128::from(self.bytes_transferred) * 100 / u128::from(self.bytes_total);
        pct.min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(kind: MediaKind, name: Option<&str>) -> MediaReference {
        MediaReference {
            chat_id: 1,
            message_id: 42,
            file_id: "AgAD".to_string(),
            file_name: name.map(str::to_string),
            file_size: None,
            mime_type: None,
            kind,
        }
    }

    #[test]
    fn test_display_name_defaults_by_kind() {
        assert_eq!(reference(MediaKind::Video, None).display_name(), "video_42.mp4");
        assert_eq!(reference(MediaKind::Audio, None).display_name(), "audio_42.mp3");
        assert_eq!(reference(MediaKind::Photo, None).display_name(), "photo_42.jpg");
        assert_eq!(reference(MediaKind::Document, None).display_name(), "file_42");
        assert_eq!(reference(MediaKind::Video, Some("clip.mkv")).display_name(), "clip.mkv");
    }

    #[test]
    fn test_display_name_takes_extension_from_mime() {
        let with_mime = |name: Option<&str>, mime: &str| MediaReference {
            mime_type: Some(mime.to_string()),
            ..reference(MediaKind::Document, name)
        };
        assert_eq!(with_mime(None, "video/mp4").display_name(), "file_42.mp4");
        assert_eq!(with_mime(None, "application/zip").display_name(), "file_42");
        assert_eq!(with_mime(Some("movie"), "video/x-matroska").display_name(), "movie.mkv");
        // An explicit extension wins over the MIME type
        assert_eq!(with_mime(Some("movie.avi"), "video/mp4").display_name(), "movie.avi");
    }

    #[test]
    fn test_percent() {
        let sample = |done, total| ProgressSample {
            bytes_transferred: done,
            bytes_total: total,
            elapsed: Duration::ZERO,
        };
        assert_eq!(sample(0, 0).percent(), 0);
        assert_eq!(sample(5, 0).percent(), 0);
        assert_eq!(sample(999, 1000).percent(), 99);
        assert_eq!(sample(1000, 1000).percent(), 100);
        assert_eq!(sample(2000, 1000).percent(), 100);
        assert_eq!(sample(u64::MAX, u64::MAX).percent(), 100);
    }

    #[test]
    fn test_media_kind_display() {
        assert_eq!(MediaKind::Document.to_string(), "document");
    }
}
