//! In-memory `TelegramPort` used by the strategy and orchestrator tests.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    config::HarvestConfig,
    domain::{Button, EntityHandle, EntityKind, MediaPayload, MessageId, RemoteMessage},
    errors::Error,
    ports::{ProgressFn, TelegramPort},
    Result,
};

pub const BOT_CHAT: i64 = 1000;
pub const GROUP_CHAT: i64 = 2000;

pub fn fast_config() -> HarvestConfig {
    HarvestConfig {
        reply_settle: Duration::ZERO,
        click_settle: Duration::ZERO,
        recent_window: 50,
        batch_size: 100,
        progress_interval: Duration::from_secs(60),
    }
}

pub fn message(id: MessageId, media: Option<MediaPayload>) -> RemoteMessage {
    RemoteMessage {
        id,
        chat_id: BOT_CHAT,
        outgoing: false,
        media,
        buttons: Vec::new(),
        reply_count: None,
    }
}

pub fn photo(id: MessageId) -> RemoteMessage {
    message(id, Some(MediaPayload::Photo))
}

pub fn document(id: MessageId, mime: &str) -> RemoteMessage {
    message(
        id,
        Some(MediaPayload::Document {
            mime_type: mime.to_string(),
        }),
    )
}

pub fn text(id: MessageId) -> RemoteMessage {
    message(id, None)
}

pub fn with_buttons(mut msg: RemoteMessage, labels: &[(&str, &str)]) -> RemoteMessage {
    msg.buttons = vec![labels
        .iter()
        .map(|(text, data)| Button::callback(*text, data.as_bytes().to_vec()))
        .collect()];
    msg
}

pub fn in_group(mut msg: RemoteMessage) -> RemoteMessage {
    msg.chat_id = GROUP_CHAT;
    msg
}

#[derive(Default)]
struct Inner {
    entities: HashMap<String, EntityHandle>,
    forbidden: HashSet<String>,

    // Bot conversation.
    history: Vec<RemoteMessage>,
    replies_on_send: Vec<RemoteMessage>,
    replies_on_click: HashMap<Vec<u8>, Vec<RemoteMessage>>,
    sent: Vec<String>,
    clicks: Vec<Vec<u8>>,

    // Channel side.
    posts: HashMap<MessageId, RemoteMessage>,
    threads: HashMap<MessageId, Vec<RemoteMessage>>,
    cursor_calls: Vec<(MessageId, usize, MessageId)>,

    // Downloads.
    failing: HashSet<MessageId>,
    flood_on: HashSet<MessageId>,
    downloads: Vec<MessageId>,
}

#[derive(Default)]
pub struct FakeTelegram {
    inner: Mutex<Inner>,
}

impl FakeTelegram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(self, username: &str, id: i64, kind: EntityKind) -> Self {
        self.inner.lock().unwrap().entities.insert(
            username.to_string(),
            EntityHandle {
                id,
                username: username.to_string(),
                kind,
            },
        );
        self
    }

    pub fn forbid(self, username: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .forbidden
            .insert(username.to_string());
        self
    }

    pub fn with_history(self, messages: Vec<RemoteMessage>) -> Self {
        self.inner.lock().unwrap().history.extend(messages);
        self
    }

    pub fn reply_on_send(self, messages: Vec<RemoteMessage>) -> Self {
        self.inner.lock().unwrap().replies_on_send = messages;
        self
    }

    pub fn reply_on_click(self, token: &str, messages: Vec<RemoteMessage>) -> Self {
        self.inner
            .lock()
            .unwrap()
            .replies_on_click
            .insert(token.as_bytes().to_vec(), messages);
        self
    }

    pub fn with_post(self, post: RemoteMessage) -> Self {
        self.inner.lock().unwrap().posts.insert(post.id, post);
        self
    }

    pub fn with_thread(self, parent: MessageId, messages: Vec<RemoteMessage>) -> Self {
        self.inner.lock().unwrap().threads.insert(parent, messages);
        self
    }

    pub fn fail_download(self, id: MessageId) -> Self {
        self.inner.lock().unwrap().failing.insert(id);
        self
    }

    pub fn flood_on_download(self, id: MessageId) -> Self {
        self.inner.lock().unwrap().flood_on.insert(id);
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .clicks
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect()
    }

    pub fn downloads(&self) -> Vec<MessageId> {
        self.inner.lock().unwrap().downloads.clone()
    }

    pub fn cursor_calls(&self) -> Vec<(MessageId, usize, MessageId)> {
        self.inner.lock().unwrap().cursor_calls.clone()
    }

    fn next_id(history: &[RemoteMessage]) -> MessageId {
        history.iter().map(|m| m.id).max().unwrap_or(0) + 1
    }
}

#[async_trait]
impl TelegramPort for FakeTelegram {
    async fn resolve_entity(&self, username: &str) -> Result<EntityHandle> {
        let inner = self.inner.lock().unwrap();
        if inner.forbidden.contains(username) {
            return Err(Error::PrivateOrForbidden(format!("@{username}")));
        }
        inner
            .entities
            .get(username)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound(username.to_string()))
    }

    async fn fetch_recent_messages(
        &self,
        _entity: &EntityHandle,
        limit: usize,
    ) -> Result<Vec<RemoteMessage>> {
        let inner = self.inner.lock().unwrap();
        let mut out = inner.history.clone();
        out.sort_by_key(|m| std::cmp::Reverse(m.id));
        out.truncate(limit);
        Ok(out)
    }

    async fn fetch_message(
        &self,
        _entity: &EntityHandle,
        id: MessageId,
    ) -> Result<Option<RemoteMessage>> {
        Ok(self.inner.lock().unwrap().posts.get(&id).cloned())
    }

    async fn fetch_messages(
        &self,
        _entity: &EntityHandle,
        parent_id: MessageId,
        limit: usize,
        before_id: MessageId,
    ) -> Result<Vec<RemoteMessage>> {
        let mut inner = self.inner.lock().unwrap();
        inner.cursor_calls.push((parent_id, limit, before_id));
        let mut out: Vec<RemoteMessage> = inner
            .threads
            .get(&parent_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|m| before_id == 0 || m.id < before_id)
            .collect();
        out.sort_by_key(|m| std::cmp::Reverse(m.id));
        out.truncate(limit);
        Ok(out)
    }

    async fn send_message(&self, _entity: &EntityHandle, text: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sent.push(text.to_string());
        let mut own = message(Self::next_id(&inner.history), None);
        own.outgoing = true;
        inner.history.push(own);
        let replies = std::mem::take(&mut inner.replies_on_send);
        inner.history.extend(replies);
        Ok(())
    }

    async fn download_media(
        &self,
        message: &RemoteMessage,
        dest: &Path,
        on_progress: ProgressFn<'_>,
    ) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.flood_on.contains(&message.id) {
                return Err(Error::FloodWait { seconds: 30 });
            }
            if inner.failing.contains(&message.id) {
                return Err(Error::External(format!(
                    "transfer of {} interrupted",
                    message.id
                )));
            }
            inner.downloads.push(message.id);
        }

        let body = format!("media-{}", message.id).into_bytes();
        let total = body.len() as u64;
        on_progress(0, total);
        std::fs::write(dest, &body)?;
        on_progress(total, total);
        Ok(())
    }

    async fn click_button(
        &self,
        _entity: &EntityHandle,
        _message: &RemoteMessage,
        token: &[u8],
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.clicks.push(token.to_vec());
        if let Some(replies) = inner.replies_on_click.remove(token) {
            inner.history.extend(replies);
        }
        Ok(())
    }
}
