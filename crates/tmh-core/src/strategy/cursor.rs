//! Cursor-paginated retrieval for a channel post's comment thread or a
//! forum topic. Everything is collected first, then downloaded from the
//! 1-based `start_from` offset so an interrupted run can resume.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    domain::{EntityHandle, EntityKind, MessageId, RemoteMessage},
    errors::Error,
    harvest::{
        download::{download_items, media_candidates},
        HarvestContext, Outcome,
    },
    ports::TelegramPort,
    strategy::RetrievalStrategy,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentScope {
    Comments { post_id: MessageId },
    Topic { topic_id: MessageId },
}

impl ParentScope {
    fn parent_id(self) -> MessageId {
        match self {
            ParentScope::Comments { post_id } => post_id,
            ParentScope::Topic { topic_id } => topic_id,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CursorBatchStrategy {
    pub channel: String,
    pub scope: ParentScope,
    pub start_from: usize,
}

impl CursorBatchStrategy {
    async fn collect(
        &self,
        port: &dyn TelegramPort,
        entity: &EntityHandle,
        ctx: &mut HarvestContext,
    ) -> Result<Vec<RemoteMessage>> {
        let parent = self.scope.parent_id();
        let limit = ctx.config.batch_size;
        let mut all = Vec::new();

        loop {
            let batch = port
                .fetch_messages(entity, parent, limit, ctx.state.offset_cursor)
                .await?;
            let Some(last) = batch.last().map(|m| m.id) else {
                break;
            };
            let short = batch.len() < limit;
            all.extend(batch);
            debug!(collected = all.len(), cursor = last, "fetched batch");

            if short {
                break;
            }
            // A cursor that does not move would repeat the same batch forever.
            if ctx.state.offset_cursor != 0 && last >= ctx.state.offset_cursor {
                break;
            }
            ctx.state.offset_cursor = last;
        }

        Ok(all)
    }
}

#[async_trait]
impl RetrievalStrategy for CursorBatchStrategy {
    fn name(&self) -> &'static str {
        match self.scope {
            ParentScope::Comments { .. } => "comments",
            ParentScope::Topic { .. } => "topic",
        }
    }

    async fn run(&self, port: &dyn TelegramPort, ctx: &mut HarvestContext) -> Result<Outcome> {
        let entity = port.resolve_entity(&self.channel).await?;
        if entity.kind == EntityKind::User {
            return Err(Error::NotAChannel(entity.username));
        }
        info!("resolved @{} (id {})", entity.username, entity.id);

        if let ParentScope::Comments { post_id } = self.scope {
            let post = port.fetch_message(&entity, post_id).await?;
            let comments = post.and_then(|p| p.reply_count).unwrap_or(0);
            if comments <= 0 {
                info!(post_id, "post not found or has no comments");
                return Ok(Outcome::NoComments);
            }
            info!(post_id, comments, "post has comments");
        }

        info!("collecting messages");
        let messages = self.collect(port, &entity, ctx).await?;
        let items = media_candidates(&messages, true);
        for (m, _) in &items {
            ctx.state.mark_seen(m.id);
        }
        ctx.state.candidates = items.len();
        info!(
            messages = messages.len(),
            media = items.len(),
            "collection finished"
        );

        if items.is_empty() {
            return Ok(Outcome::NoContent);
        }

        let start = self.start_from.max(1);
        if start > items.len() {
            info!(
                start_from = start,
                available = items.len(),
                "resume offset past the last media item"
            );
            return Ok(Outcome::OffsetBeyondEnd {
                start_from: start,
                available: items.len(),
            });
        }
        if start > 1 {
            info!("skipping the first {} items", start - 1);
        }

        download_items(port, ctx, &items[start - 1..], start, items.len()).await?;
        Ok(Outcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::HarvestConfig,
        naming::DestinationLayout,
        testing::{fast_config, in_group, photo, text, FakeTelegram, GROUP_CHAT},
    };

    fn comments(post_id: MessageId, start_from: usize) -> CursorBatchStrategy {
        CursorBatchStrategy {
            channel: "news".into(),
            scope: ParentScope::Comments { post_id },
            start_from,
        }
    }

    fn post(id: MessageId, replies: i32) -> RemoteMessage {
        let mut p = text(id);
        p.reply_count = Some(replies);
        p
    }

    fn channel() -> FakeTelegram {
        FakeTelegram::new().with_entity("news", GROUP_CHAT, EntityKind::Channel)
    }

    fn ctx_with_batch(root: &std::path::Path, batch_size: usize) -> HarvestContext {
        let config = HarvestConfig {
            batch_size,
            ..fast_config()
        };
        HarvestContext::new(config, DestinationLayout::new(root))
    }

    fn image_names(root: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root.join("图片"))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort_by_key(|n| n.split('_').nth(1).map(str::to_string));
        names
    }

    #[tokio::test]
    async fn resumes_from_offset_across_batches() {
        let tmp = tempfile::tempdir().unwrap();
        let thread: Vec<_> = (101..=110).map(|id| in_group(photo(id))).collect();
        let port = channel().with_post(post(100, 10)).with_thread(100, thread);
        let mut ctx = ctx_with_batch(tmp.path(), 3);

        let outcome = comments(100, 5).run(&port, &mut ctx).await.unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(ctx.state.candidates, 10);
        assert_eq!(ctx.state.total_downloaded, 6);
        assert_eq!(port.downloads(), vec![105, 106, 107, 108, 109, 110]);

        let names = image_names(tmp.path());
        assert_eq!(names.len(), 6);
        assert!(names[0].ends_with("_005.jpg"), "{names:?}");
        assert!(names[5].ends_with("_010.jpg"), "{names:?}");

        let cursors: Vec<MessageId> = port.cursor_calls().iter().map(|c| c.2).collect();
        assert_eq!(cursors, vec![0, 108, 105, 102]);
    }

    #[tokio::test]
    async fn missing_post_or_no_replies_means_no_comments() {
        let tmp = tempfile::tempdir().unwrap();
        let port = channel().with_post(post(5, 0));
        let mut ctx = ctx_with_batch(tmp.path(), 100);

        assert_eq!(
            comments(5, 1).run(&port, &mut ctx).await.unwrap(),
            Outcome::NoComments
        );
        assert_eq!(
            comments(6, 1).run(&port, &mut ctx).await.unwrap(),
            Outcome::NoComments
        );
        assert!(port.cursor_calls().is_empty());
    }

    #[tokio::test]
    async fn offset_past_the_end_downloads_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let thread = vec![in_group(photo(11)), in_group(text(12)), in_group(photo(13))];
        let port = channel().with_post(post(10, 3)).with_thread(10, thread);
        let mut ctx = ctx_with_batch(tmp.path(), 100);

        let outcome = comments(10, 4).run(&port, &mut ctx).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::OffsetBeyondEnd {
                start_from: 4,
                available: 2
            }
        );
        assert!(port.downloads().is_empty());
    }

    #[tokio::test]
    async fn forbidden_channel_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let port = channel().forbid("news");
        let mut ctx = ctx_with_batch(tmp.path(), 100);

        let err = comments(1, 1).run(&port, &mut ctx).await.unwrap_err();

        assert!(matches!(err, Error::PrivateOrForbidden(_)));
    }

    #[tokio::test]
    async fn user_accounts_are_rejected_before_any_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let port = FakeTelegram::new()
            .with_entity("news", GROUP_CHAT, EntityKind::User)
            .with_post(post(5, 1))
            .with_thread(5, vec![in_group(photo(6))]);
        let mut ctx = ctx_with_batch(tmp.path(), 100);

        let err = comments(5, 1).run(&port, &mut ctx).await.unwrap_err();

        assert!(matches!(err, Error::NotAChannel(ref u) if u == "news"));
        assert!(port.cursor_calls().is_empty());
        assert!(port.downloads().is_empty());

        let topic = CursorBatchStrategy {
            channel: "news".into(),
            scope: ParentScope::Topic { topic_id: 5 },
            start_from: 1,
        };
        let err = topic.run(&port, &mut ctx).await.unwrap_err();
        assert!(matches!(err, Error::NotAChannel(_)));
    }

    #[tokio::test]
    async fn topic_collects_every_page_and_skips_text() {
        let tmp = tempfile::tempdir().unwrap();
        let thread = vec![
            in_group(photo(21)),
            in_group(text(22)),
            in_group(photo(23)),
            in_group(text(24)),
            in_group(photo(25)),
        ];
        let port = FakeTelegram::new()
            .with_entity("forum", GROUP_CHAT, EntityKind::Group)
            .with_thread(20, thread);
        let mut ctx = ctx_with_batch(tmp.path(), 2);
        let strategy = CursorBatchStrategy {
            channel: "forum".into(),
            scope: ParentScope::Topic { topic_id: 20 },
            start_from: 0,
        };

        let outcome = strategy.run(&port, &mut ctx).await.unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(port.downloads(), vec![21, 23, 25]);
        assert_eq!(ctx.state.failed, 0);
        let names = image_names(tmp.path());
        assert!(names[0].ends_with("_001.jpg") && names[2].ends_with("_003.jpg"));
    }
}
