//! Harvest orchestration: pick a retrieval strategy for a target, run it
//! against a per-run context, and summarize the result.

pub mod download;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::info;

use crate::{
    config::HarvestConfig,
    domain::{MessageId, TargetDescriptor},
    naming::DestinationLayout,
    ports::TelegramPort,
    strategy, Result,
};

/// How a run ended. None of these are errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Bot flow: no next-page control on the latest page.
    Done,
    /// Bot flow: the remote side produced no new messages.
    Stalled,
    /// Bot flow: `max_pages` reached.
    PageLimit,
    /// Cursor flow: every collected media item was processed.
    Completed,
    /// Comment flow: the post is missing or has no comments.
    NoComments,
    /// Nothing carrying media was found.
    NoContent,
    /// The resume offset lies past the last media item.
    OffsetBeyondEnd { start_from: usize, available: usize },
}

/// Mutable state of one run. Owned by the run's [`HarvestContext`]; never shared.
#[derive(Clone, Debug, Default)]
pub struct HarvestState {
    /// Newest message id before `/start` was sent (bot flow only).
    pub watermark: MessageId,
    downloaded_ids: HashSet<MessageId>,
    pub total_downloaded: usize,
    pub failed: usize,
    /// Media items found by the retrieval step.
    pub candidates: usize,
    pub current_page: u32,
    pub pages_processed: u32,
    pub offset_cursor: MessageId,
}

impl HarvestState {
    /// Record `id` as claimed for download. Returns false if it already was.
    pub fn mark_seen(&mut self, id: MessageId) -> bool {
        self.downloaded_ids.insert(id)
    }

    pub fn is_seen(&self, id: MessageId) -> bool {
        self.downloaded_ids.contains(&id)
    }
}

/// Everything a strategy touches during a run.
pub struct HarvestContext {
    pub config: HarvestConfig,
    pub layout: DestinationLayout,
    pub state: HarvestState,
}

impl HarvestContext {
    pub fn new(config: HarvestConfig, layout: DestinationLayout) -> Self {
        Self {
            config,
            layout,
            state: HarvestState::default(),
        }
    }

    fn into_report(self, strategy: &str, outcome: Outcome) -> HarvestReport {
        HarvestReport {
            strategy: strategy.to_string(),
            outcome,
            total_downloaded: self.state.total_downloaded,
            failed: self.state.failed,
            candidates: self.state.candidates,
            pages: self.state.pages_processed,
            destination: self.layout.root().to_path_buf(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    /// Bot flow page limit; 0 means unbounded.
    pub max_pages: u32,
    /// 1-based resume offset for the cursor flows.
    pub start_from: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_pages: 100,
            start_from: 1,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HarvestReport {
    pub strategy: String,
    pub outcome: Outcome,
    pub total_downloaded: usize,
    pub failed: usize,
    pub candidates: usize,
    pub pages: u32,
    pub destination: PathBuf,
}

pub struct Harvester<'a> {
    port: &'a dyn TelegramPort,
    config: HarvestConfig,
}

impl<'a> Harvester<'a> {
    pub fn new(port: &'a dyn TelegramPort, config: HarvestConfig) -> Self {
        Self { port, config }
    }

    /// Harvest `target` into `<out_dir>/<username>/<sub key>/`.
    ///
    /// Fatal errors abort the run; files already saved stay where they are.
    pub async fn run(
        &self,
        target: &TargetDescriptor,
        options: RunOptions,
        out_dir: &Path,
    ) -> Result<HarvestReport> {
        let layout = DestinationLayout::for_target(out_dir, target);
        layout.ensure_root()?;
        info!("save path: {}", layout.root().display());

        let strategy = strategy::for_target(target, options);
        let mut ctx = HarvestContext::new(self.config.clone(), layout);
        let outcome = strategy.run(self.port, &mut ctx).await?;

        let report = ctx.into_report(strategy.name(), outcome);
        info!(
            outcome = ?report.outcome,
            total = report.total_downloaded,
            failed = report.failed,
            "harvest finished, saved to {}",
            report.destination.display()
        );
        Ok(report)
    }
}
