use std::fmt;

use serde::Serialize;

use crate::domain::{MediaPayload, MessageId, RemoteMessage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    File,
}

impl MediaKind {
    /// Destination subfolder under the run root; `None` means the root itself.
    pub fn subfolder(self) -> Option<&'static str> {
        match self {
            MediaKind::Image => Some("图片"),
            MediaKind::Video => Some("视频"),
            MediaKind::File => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::File => "file",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub extension: String,
    pub source_message_id: MessageId,
}

/// Classify a message's media. `None` means "not a media item", which callers skip.
pub fn classify(message: &RemoteMessage) -> Option<MediaItem> {
    let (kind, extension) = match message.media.as_ref()? {
        MediaPayload::Photo => (MediaKind::Image, "jpg".to_string()),
        MediaPayload::Video { .. } => (MediaKind::Video, "mp4".to_string()),
        MediaPayload::Document { mime_type } => classify_mime(mime_type),
    };

    Some(MediaItem {
        kind,
        extension,
        source_message_id: message.id,
    })
}

fn classify_mime(mime_type: &str) -> (MediaKind, String) {
    if let Some(sub) = mime_type.strip_prefix("image/") {
        return (MediaKind::Image, sub.to_string());
    }
    if let Some(sub) = mime_type.strip_prefix("video/") {
        return (MediaKind::Video, sub.to_string());
    }
    match mime_type.rsplit_once('/') {
        Some((_, sub)) => (MediaKind::File, sub.to_string()),
        None => (MediaKind::File, "bin".to_string()),
    }
}
