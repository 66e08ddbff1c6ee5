use std::path::Path;

use async_trait::async_trait;

use crate::{
    domain::{EntityHandle, MessageId, RemoteMessage},
    Result,
};

/// Progress callback: `(bytes_so_far, bytes_total)`.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(u64, u64) + Send);

/// Hexagonal port for the remote Telegram account.
///
/// Implementations map transport errors into [`crate::Error`]; in particular
/// remote throttling must surface as `Error::FloodWait`.
#[async_trait]
pub trait TelegramPort: Send + Sync {
    /// Fails with `Error::EntityNotFound` when the username does not resolve.
    async fn resolve_entity(&self, username: &str) -> Result<EntityHandle>;

    /// Most recent `limit` messages, newest first.
    async fn fetch_recent_messages(
        &self,
        entity: &EntityHandle,
        limit: usize,
    ) -> Result<Vec<RemoteMessage>>;

    async fn fetch_message(
        &self,
        entity: &EntityHandle,
        id: MessageId,
    ) -> Result<Option<RemoteMessage>>;

    /// Up to `limit` messages replying to `parent_id` (a post's comment thread or
    /// a forum topic), newest first, strictly older than `before_id` (0 = latest).
    async fn fetch_messages(
        &self,
        entity: &EntityHandle,
        parent_id: MessageId,
        limit: usize,
        before_id: MessageId,
    ) -> Result<Vec<RemoteMessage>>;

    async fn send_message(&self, entity: &EntityHandle, text: &str) -> Result<()>;

    async fn download_media(
        &self,
        message: &RemoteMessage,
        dest: &Path,
        on_progress: ProgressFn<'_>,
    ) -> Result<()>;

    async fn click_button(
        &self,
        entity: &EntityHandle,
        message: &RemoteMessage,
        token: &[u8],
    ) -> Result<()>;
}

/// Answers the interactive login challenge (phone, code, 2FA password).
///
/// Only invoked when the stored session is not already authorized.
#[async_trait]
pub trait ChallengeProvider: Send + Sync {
    async fn phone(&self) -> Result<String>;
    async fn code(&self) -> Result<String>;
    async fn password(&self) -> Result<String>;
}
