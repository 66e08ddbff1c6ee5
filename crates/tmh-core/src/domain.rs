/// Telegram message id (numeric, monotonic per conversation).
pub type MessageId = i32;

/// What a link points at. Produced by the link parser, consumed once to pick a
/// retrieval strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetDescriptor {
    /// `https://t.me/<bot>?start=<param>`
    BotStart { username: String, param: String },
    /// `https://t.me/<channel>/<message_id>`, harvested through its comment thread.
    ChannelPost {
        username: String,
        message_id: MessageId,
    },
    /// `https://t.me/<channel>/<topic_id>`, harvested through the topic's messages.
    ChannelTopic {
        username: String,
        topic_id: MessageId,
    },
}

impl TargetDescriptor {
    pub fn username(&self) -> &str {
        match self {
            TargetDescriptor::BotStart { username, .. }
            | TargetDescriptor::ChannelPost { username, .. }
            | TargetDescriptor::ChannelTopic { username, .. } => username,
        }
    }

    /// Second path component of the output layout.
    pub fn sub_key(&self) -> String {
        match self {
            TargetDescriptor::BotStart { param, .. } => param.clone(),
            TargetDescriptor::ChannelPost { message_id, .. } => message_id.to_string(),
            TargetDescriptor::ChannelTopic { topic_id, .. } => topic_id.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Group,
    Channel,
}

/// A resolved remote entity (bot, channel or group).
///
/// The adapter keeps whatever it needs to address the entity again, keyed by `id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityHandle {
    pub id: i64,
    pub username: String,
    pub kind: EntityKind,
}

/// Media attached to a message, as far as the harvester cares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaPayload {
    Photo,
    Video { mime_type: String },
    Document { mime_type: String },
}

/// An inline keyboard button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    /// Callback token; `None` for URL / non-callback buttons.
    pub data: Option<Vec<u8>>,
}

impl Button {
    pub fn callback(text: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            text: text.into(),
            data: Some(data.into()),
        }
    }
}

/// A message in the remote conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteMessage {
    pub id: MessageId,
    /// Chat the message lives in (comment threads live in the linked discussion group).
    pub chat_id: i64,
    /// Sent by this client.
    pub outgoing: bool,
    pub media: Option<MediaPayload>,
    pub buttons: Vec<Vec<Button>>,
    /// Comment count exposed by a channel post, if any.
    pub reply_count: Option<i32>,
}

impl RemoteMessage {
    pub fn has_buttons(&self) -> bool {
        self.buttons.iter().any(|row| !row.is_empty())
    }
}
