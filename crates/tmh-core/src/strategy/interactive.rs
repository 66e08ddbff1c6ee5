//! Bot deep-link flow: `/start <param>`, then follow the bot's inline
//! pagination until it stops offering a next page.
//!
//! States: awaiting reply -> page ready -> paginating -> done | stalled.
//! The loop has exactly three exits: page limit, no new messages, no
//! next-page control. A bot that always offers "next" is bounded only by
//! `max_pages` (0 = unbounded).

use async_trait::async_trait;
use tracing::info;

use crate::{
    domain::RemoteMessage,
    harvest::{
        download::{download_items, media_candidates},
        HarvestContext, Outcome,
    },
    ports::TelegramPort,
    strategy::{buttons::find_next_page_button, settle, RetrievalStrategy},
    Result,
};

#[derive(Clone, Debug)]
pub struct InteractiveStrategy {
    pub bot: String,
    pub start_param: String,
    pub max_pages: u32,
}

#[async_trait]
impl RetrievalStrategy for InteractiveStrategy {
    fn name(&self) -> &'static str {
        "interactive"
    }

    async fn run(&self, port: &dyn TelegramPort, ctx: &mut HarvestContext) -> Result<Outcome> {
        info!("connecting to bot @{}", self.bot);
        let bot = port.resolve_entity(&self.bot).await?;

        let latest = port.fetch_recent_messages(&bot, 1).await?;
        ctx.state.watermark = latest.iter().map(|m| m.id).max().unwrap_or(0);

        let command = format!("/start {}", self.start_param);
        info!("sending command: {command}");
        port.send_message(&bot, &command).await?;

        info!("waiting for the bot to reply");
        settle(ctx.config.reply_settle).await;

        ctx.state.current_page = 1;
        loop {
            let page = ctx.state.current_page;
            info!(page, "processing page");

            let recent = port
                .fetch_recent_messages(&bot, ctx.config.recent_window)
                .await?;
            let fresh: Vec<RemoteMessage> = recent
                .into_iter()
                .filter(|m| {
                    !m.outgoing && m.id > ctx.state.watermark && !ctx.state.is_seen(m.id)
                })
                .collect();

            if fresh.is_empty() {
                info!(page, "no new messages");
                return Ok(Outcome::Stalled);
            }
            ctx.state.pages_processed += 1;

            // Claim before downloading so a failed item is not retried on the next page.
            for m in fresh.iter().filter(|m| m.media.is_some()) {
                ctx.state.mark_seen(m.id);
            }

            let items = media_candidates(&fresh, false);
            ctx.state.candidates += items.len();
            let first_index = ctx.state.total_downloaded + 1;
            let display_total = ctx.state.total_downloaded + items.len();
            let downloaded = download_items(port, ctx, &items, first_index, display_total).await?;
            info!(page, downloaded, "page complete");

            let Some((holder, button)) = find_next_page_button(&fresh, page) else {
                info!("no more pages");
                return Ok(Outcome::Done);
            };

            if self.max_pages > 0 && page >= self.max_pages {
                info!(max_pages = self.max_pages, "page limit reached");
                return Ok(Outcome::PageLimit);
            }

            let Some(token) = button.data.as_deref() else {
                return Ok(Outcome::Done);
            };
            info!("clicking button: {}", button.text);
            port.click_button(&bot, holder, token).await?;

            settle(ctx.config.click_settle).await;
            ctx.state.current_page += 1;
        }
    }
}
