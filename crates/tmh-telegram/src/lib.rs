//! Telegram adapter (grammers, user account over MTProto).
//!
//! This crate implements the `tmh-core` TelegramPort. A user session is
//! needed because bots cannot press other bots' inline buttons or read
//! comment threads.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use grammers_client::{types::Chat, Client, Config, InitParams, SignInError};
use grammers_mtsender::InvocationError;
use grammers_session::{PackedChat, Session};
use grammers_tl_types as tl;
use tokio::{io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, info};

mod console;
mod convert;
mod errors;

pub use console::ConsoleChallenge;

use convert::{convert, messages_of, RemoteFile};
use errors::map_invocation;
use tmh_core::{
    domain::{EntityHandle, EntityKind, MessageId, RemoteMessage},
    errors::Error,
    ports::{ChallengeProvider, ProgressFn, TelegramPort},
    Result,
};

/// `upload.getFile` chunk; must divide 1 MiB and be a multiple of 4 KiB.
const CHUNK_SIZE: i32 = 512 * 1024;

pub struct TelegramClient {
    client: Client,
    session_path: PathBuf,
    chats: Mutex<HashMap<i64, PackedChat>>,
    files: Mutex<HashMap<(i64, MessageId), RemoteFile>>,
}

impl TelegramClient {
    /// Connect with the session stored at `session_path`, creating it if absent.
    pub async fn connect(api_id: i32, api_hash: &str, session_path: &Path) -> Result<Self> {
        let session = Session::load_file_or_create(session_path)?;
        let client = Client::connect(Config {
            session,
            api_id,
            api_hash: api_hash.to_string(),
            params: init_params(),
        })
        .await
        .map_err(|e| Error::External(format!("connect failed: {e}")))?;
        info!("connected, session {}", session_path.display());

        Ok(Self {
            client,
            session_path: session_path.to_path_buf(),
            chats: Mutex::new(HashMap::new()),
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Log in through `challenge` unless the stored session is already authorized.
    pub async fn ensure_authorized(&self, challenge: &dyn ChallengeProvider) -> Result<()> {
        let authorized = self
            .client
            .is_authorized()
            .await
            .map_err(|e| map_invocation(e, "session"))?;
        if authorized {
            debug!("session already authorized");
            return Ok(());
        }

        let phone = challenge.phone().await?;
        let token = self
            .client
            .request_login_code(&phone)
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;
        let code = challenge.code().await?;

        match self.client.sign_in(&token, &code).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let password = challenge.password().await?;
                self.client
                    .check_password(password_token, password.as_bytes())
                    .await
                    .map_err(|e| Error::Auth(e.to_string()))?;
            }
            Err(e) => return Err(Error::Auth(e.to_string())),
        }

        info!("signed in");
        self.save_session()
    }

    pub fn save_session(&self) -> Result<()> {
        self.client.session().save_to_file(&self.session_path)?;
        Ok(())
    }

    async fn packed(&self, entity: &EntityHandle) -> Result<PackedChat> {
        self.chats
            .lock()
            .await
            .get(&entity.id)
            .copied()
            .ok_or_else(|| Error::EntityNotFound(entity.username.clone()))
    }

    /// Convert a raw response, remembering where each message's media lives.
    async fn remember(&self, res: tl::enums::messages::Messages) -> Vec<RemoteMessage> {
        let mut files = self.files.lock().await;
        messages_of(res)
            .into_iter()
            .map(|raw| {
                let converted = convert(raw);
                if let Some(file) = converted.file {
                    files.insert((converted.message.chat_id, converted.message.id), file);
                }
                converted.message
            })
            .collect()
    }

    async fn history(
        &self,
        entity: &EntityHandle,
        offset_id: MessageId,
        limit: usize,
    ) -> Result<Vec<RemoteMessage>> {
        let peer = self.packed(entity).await?;
        let res = self
            .client
            .invoke(&tl::functions::messages::GetHistory {
                peer: peer.to_input_peer(),
                offset_id,
                offset_date: 0,
                add_offset: 0,
                limit: page_limit(limit),
                max_id: 0,
                min_id: 0,
                hash: 0,
            })
            .await
            .map_err(|e| map_invocation(e, &format!("@{}", entity.username)))?;
        Ok(self.remember(res).await)
    }
}

/// Flood waits must reach the caller as `Error::FloodWait`; grammers would
/// otherwise sleep through short ones and retry on its own.
fn init_params() -> InitParams {
    InitParams {
        flood_sleep_threshold: 0,
        ..InitParams::default()
    }
}

/// Progress pair for a chunk. An unknown size (0) stays 0 until the last
/// chunk, which reports `(done, done)` so completion is always printed.
fn chunk_progress(done: u64, declared_total: u64, last: bool) -> (u64, u64) {
    if last {
        (done, done)
    } else {
        (done, declared_total)
    }
}

fn page_limit(limit: usize) -> i32 {
    i32::try_from(limit).unwrap_or(i32::MAX)
}

fn entity_kind(chat: &Chat) -> EntityKind {
    match chat {
        Chat::User(_) => EntityKind::User,
        Chat::Group(_) => EntityKind::Group,
        Chat::Channel(_) => EntityKind::Channel,
    }
}

#[async_trait]
impl TelegramPort for TelegramClient {
    async fn resolve_entity(&self, username: &str) -> Result<EntityHandle> {
        let chat = self
            .client
            .resolve_username(username)
            .await
            .map_err(|e| map_invocation(e, &format!("@{username}")))?
            .ok_or_else(|| Error::EntityNotFound(username.to_string()))?;

        let handle = EntityHandle {
            id: chat.id(),
            username: username.to_string(),
            kind: entity_kind(&chat),
        };
        self.chats.lock().await.insert(handle.id, chat.pack());
        debug!(id = handle.id, kind = ?handle.kind, "resolved @{username}");
        Ok(handle)
    }

    async fn fetch_recent_messages(
        &self,
        entity: &EntityHandle,
        limit: usize,
    ) -> Result<Vec<RemoteMessage>> {
        self.history(entity, 0, limit).await
    }

    async fn fetch_message(
        &self,
        entity: &EntityHandle,
        id: MessageId,
    ) -> Result<Option<RemoteMessage>> {
        // History is served strictly below `offset_id`.
        let found = self.history(entity, id.saturating_add(1), 1).await?;
        Ok(found.into_iter().find(|m| m.id == id))
    }

    async fn fetch_messages(
        &self,
        entity: &EntityHandle,
        parent_id: MessageId,
        limit: usize,
        before_id: MessageId,
    ) -> Result<Vec<RemoteMessage>> {
        let peer = self.packed(entity).await?;
        let res = self
            .client
            .invoke(&tl::functions::messages::GetReplies {
                peer: peer.to_input_peer(),
                msg_id: parent_id,
                offset_id: before_id,
                offset_date: 0,
                add_offset: 0,
                limit: page_limit(limit),
                max_id: 0,
                min_id: 0,
                hash: 0,
            })
            .await
            .map_err(|e| map_invocation(e, &format!("@{} thread {parent_id}", entity.username)))?;
        Ok(self.remember(res).await)
    }

    async fn send_message(&self, entity: &EntityHandle, text: &str) -> Result<()> {
        let peer = self.packed(entity).await?;
        self.client
            .send_message(peer, text)
            .await
            .map_err(|e| map_invocation(e, &format!("@{}", entity.username)))?;
        Ok(())
    }

    async fn download_media(
        &self,
        message: &RemoteMessage,
        dest: &Path,
        on_progress: ProgressFn<'_>,
    ) -> Result<()> {
        let file = self
            .files
            .lock()
            .await
            .get(&(message.chat_id, message.id))
            .cloned()
            .ok_or_else(|| {
                Error::External(format!("message {} has no downloadable media", message.id))
            })?;

        let total = u64::try_from(file.size).unwrap_or(0);
        let mut out = tokio::fs::File::create(dest).await?;
        let mut offset: i64 = 0;
        let mut dc: Option<i32> = None;
        on_progress(0, total);

        loop {
            let request = tl::functions::upload::GetFile {
                precise: false,
                cdn_supported: false,
                location: file.location.clone(),
                offset,
                limit: CHUNK_SIZE,
            };
            let res = match dc {
                Some(dc_id) => self.client.invoke_in_dc(&request, dc_id).await,
                None => self.client.invoke(&request).await,
            };
            let bytes = match res {
                Ok(tl::enums::upload::File::File(chunk)) => chunk.bytes,
                Ok(tl::enums::upload::File::CdnRedirect(_)) => {
                    return Err(Error::External(format!(
                        "message {}: CDN redirect is not supported",
                        message.id
                    )));
                }
                Err(InvocationError::Rpc(rpc)) if rpc.name == "FILE_MIGRATE" => {
                    let target = rpc.value.and_then(|v| i32::try_from(v).ok());
                    if target.is_none() || target == dc {
                        return Err(errors::map_rpc(&rpc, &format!("message {}", message.id)));
                    }
                    debug!(message_id = message.id, dc = ?target, "file lives in another dc");
                    dc = target;
                    continue;
                }
                Err(e) => return Err(map_invocation(e, &format!("message {}", message.id))),
            };

            out.write_all(&bytes).await?;
            offset += bytes.len() as i64;
            let last = bytes.len() < CHUNK_SIZE as usize;
            let (done, reported_total) = chunk_progress(offset as u64, total, last);
            on_progress(done, reported_total);
            if last {
                break;
            }
        }

        out.flush().await?;
        Ok(())
    }

    async fn click_button(
        &self,
        entity: &EntityHandle,
        message: &RemoteMessage,
        token: &[u8],
    ) -> Result<()> {
        let peer = self.packed(entity).await?;
        let res = self
            .client
            .invoke(&tl::functions::messages::GetBotCallbackAnswer {
                game: false,
                peer: peer.to_input_peer(),
                msg_id: message.id,
                data: Some(token.to_vec()),
                password: None,
            })
            .await;
        match res {
            Ok(_) => Ok(()),
            // The bot got the press; it just did not answer the spinner in time.
            Err(InvocationError::Rpc(rpc)) if rpc.name == "BOT_RESPONSE_TIMEOUT" => {
                debug!(message_id = message.id, "callback answer timed out");
                Ok(())
            }
            Err(e) => Err(map_invocation(e, &format!("@{}", entity.username))),
        }
    }
}
