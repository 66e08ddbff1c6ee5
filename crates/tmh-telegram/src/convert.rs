//! Raw TL objects to core domain values.

use grammers_tl_types as tl;

use tmh_core::domain::{Button, MediaPayload, RemoteMessage};

/// Where to fetch a message's media from, kept next to the domain message.
#[derive(Clone, Debug)]
pub(crate) struct RemoteFile {
    pub location: tl::enums::InputFileLocation,
    /// Declared byte size; 0 when unknown.
    pub size: i64,
}

pub(crate) struct Converted {
    pub message: RemoteMessage,
    pub file: Option<RemoteFile>,
}

/// Regular messages of a history/replies response; service messages are dropped.
pub(crate) fn messages_of(res: tl::enums::messages::Messages) -> Vec<tl::types::Message> {
    use tl::enums::messages::Messages;

    let raw = match res {
        Messages::Messages(m) => m.messages,
        Messages::Slice(m) => m.messages,
        Messages::ChannelMessages(m) => m.messages,
        Messages::NotModified(_) => Vec::new(),
    };
    raw.into_iter()
        .filter_map(|m| match m {
            tl::enums::Message::Message(m) => Some(m),
            _ => None,
        })
        .collect()
}

pub(crate) fn convert(m: tl::types::Message) -> Converted {
    let (media, file) = match media_of(m.media.as_ref()) {
        Some((payload, file)) => (Some(payload), Some(file)),
        None => (None, None),
    };
    let reply_count = m.replies.as_ref().map(|r| match r {
        tl::enums::MessageReplies::Replies(r) => r.replies,
    });

    Converted {
        message: RemoteMessage {
            id: m.id,
            chat_id: peer_id(&m.peer_id),
            outgoing: m.out,
            media,
            buttons: buttons_of(m.reply_markup.as_ref()),
            reply_count,
        },
        file,
    }
}

pub(crate) fn peer_id(peer: &tl::enums::Peer) -> i64 {
    match peer {
        tl::enums::Peer::User(p) => p.user_id,
        tl::enums::Peer::Chat(p) => p.chat_id,
        tl::enums::Peer::Channel(p) => p.channel_id,
    }
}

fn media_of(media: Option<&tl::enums::MessageMedia>) -> Option<(MediaPayload, RemoteFile)> {
    match media? {
        tl::enums::MessageMedia::Photo(m) => match m.photo.as_ref()? {
            tl::enums::Photo::Photo(photo) => {
                let (thumb_size, size) = largest_photo_size(&photo.sizes)?;
                let location = tl::types::InputPhotoFileLocation {
                    id: photo.id,
                    access_hash: photo.access_hash,
                    file_reference: photo.file_reference.clone(),
                    thumb_size,
                }
                .into();
                Some((MediaPayload::Photo, RemoteFile { location, size }))
            }
            tl::enums::Photo::Empty(_) => None,
        },
        tl::enums::MessageMedia::Document(m) => match m.document.as_ref()? {
            tl::enums::Document::Document(doc) => {
                let location = tl::types::InputDocumentFileLocation {
                    id: doc.id,
                    access_hash: doc.access_hash,
                    file_reference: doc.file_reference.clone(),
                    thumb_size: String::new(),
                }
                .into();
                Some((
                    document_payload(doc),
                    RemoteFile {
                        location,
                        size: doc.size,
                    },
                ))
            }
            tl::enums::Document::Empty(_) => None,
        },
        _ => None,
    }
}

fn document_payload(doc: &tl::types::Document) -> MediaPayload {
    let mime_type = doc.mime_type.clone();
    let native_video = doc.attributes.iter().any(|a| {
        matches!(a, tl::enums::DocumentAttribute::Video(v) if !v.round_message)
    });
    if native_video {
        MediaPayload::Video { mime_type }
    } else {
        MediaPayload::Document { mime_type }
    }
}

/// Thumb type and byte size of the biggest downloadable size of a photo.
pub(crate) fn largest_photo_size(sizes: &[tl::enums::PhotoSize]) -> Option<(String, i64)> {
    sizes
        .iter()
        .filter_map(|s| match s {
            tl::enums::PhotoSize::Size(s) => Some((s.r#type.clone(), i64::from(s.size))),
            tl::enums::PhotoSize::Progressive(s) => s
                .sizes
                .iter()
                .max()
                .map(|largest| (s.r#type.clone(), i64::from(*largest))),
            _ => None,
        })
        .max_by_key(|(_, size)| *size)
}

/// Inline keyboard rows. Reply keyboards carry no callback data and are ignored.
pub(crate) fn buttons_of(markup: Option<&tl::enums::ReplyMarkup>) -> Vec<Vec<Button>> {
    let Some(tl::enums::ReplyMarkup::ReplyInlineMarkup(inline)) = markup else {
        return Vec::new();
    };
    inline
        .rows
        .iter()
        .map(|row| {
            let tl::enums::KeyboardButtonRow::Row(row) = row;
            row.buttons.iter().filter_map(button_of).collect()
        })
        .collect()
}

fn button_of(b: &tl::enums::KeyboardButton) -> Option<Button> {
    match b {
        tl::enums::KeyboardButton::Callback(c) => Some(Button::callback(c.text.clone(), c.data.clone())),
        tl::enums::KeyboardButton::Url(u) => Some(Button {
            text: u.text.clone(),
            data: None,
        }),
        _ => None,
    }
}
