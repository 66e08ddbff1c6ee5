//! Retrieval strategies: how candidate messages are pulled from the remote side.
//!
//! The bot deep-link flow paginates by clicking inline buttons; comment threads
//! and forum topics page through replies with a message-id cursor.

pub mod buttons;
pub mod cursor;
pub mod interactive;

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::TargetDescriptor,
    harvest::{HarvestContext, Outcome, RunOptions},
    ports::TelegramPort,
    Result,
};

pub use cursor::{CursorBatchStrategy, ParentScope};
pub use interactive::InteractiveStrategy;

#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Retrieve, filter and download everything reachable from the target.
    async fn run(&self, port: &dyn TelegramPort, ctx: &mut HarvestContext) -> Result<Outcome>;
}

pub fn for_target(target: &TargetDescriptor, options: RunOptions) -> Box<dyn RetrievalStrategy> {
    match target {
        TargetDescriptor::BotStart { username, param } => Box::new(InteractiveStrategy {
            bot: username.clone(),
            start_param: param.clone(),
            max_pages: options.max_pages,
        }),
        TargetDescriptor::ChannelPost {
            username,
            message_id,
        } => Box::new(CursorBatchStrategy {
            channel: username.clone(),
            scope: ParentScope::Comments {
                post_id: *message_id,
            },
            start_from: options.start_from,
        }),
        TargetDescriptor::ChannelTopic { username, topic_id } => Box::new(CursorBatchStrategy {
            channel: username.clone(),
            scope: ParentScope::Topic {
                topic_id: *topic_id,
            },
            start_from: options.start_from,
        }),
    }
}

/// Fixed wait for a remote side that gives no completion signal.
pub(crate) async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
