use std::path::PathBuf;

use tracing::{info, warn};

use crate::{
    classify::{classify, MediaItem},
    domain::RemoteMessage,
    harvest::HarvestContext,
    naming::{self, DestinationLayout},
    ports::TelegramPort,
    progress::ProgressReporter,
    Result,
};

/// A message paired with its classification, ready for download.
pub type Candidate = (RemoteMessage, MediaItem);

/// Media-bearing messages in chronological (ascending id) order, one entry per id.
pub fn media_candidates(messages: &[RemoteMessage], include_outgoing: bool) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = messages
        .iter()
        .filter(|m| include_outgoing || !m.outgoing)
        .filter_map(|m| classify(m).map(|item| (m.clone(), item)))
        .collect();
    out.sort_by_key(|(m, _)| m.id);
    out.dedup_by_key(|(m, _)| m.id);
    out
}

/// Download `items` sequentially, numbering them from `first_index`.
///
/// A failing item is logged with its message id and skipped; only errors that
/// invalidate the whole run (flood wait, lost access) abort the batch.
/// Returns the number of files persisted.
pub async fn download_items(
    port: &dyn TelegramPort,
    ctx: &mut HarvestContext,
    items: &[Candidate],
    first_index: usize,
    display_total: usize,
) -> Result<usize> {
    let mut downloaded = 0usize;

    for (offset, (message, item)) in items.iter().enumerate() {
        let index = first_index + offset;
        let temp_name = naming::temp_file_name(index, &item.extension);
        info!("[{index}/{display_total}] downloading {}: {temp_name}", item.kind);

        match download_one(port, &ctx.layout, ctx.config.progress_interval, message, item, index)
            .await
        {
            Ok(saved) => {
                let name = saved
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                info!("  saved as {name}");
                downloaded += 1;
                ctx.state.total_downloaded += 1;
            }
            Err(e) if e.is_fatal_for_batch() => return Err(e),
            Err(e) => {
                warn!(message_id = message.id, "download failed: {e}");
                ctx.state.failed += 1;
            }
        }
    }

    Ok(downloaded)
}

async fn download_one(
    port: &dyn TelegramPort,
    layout: &DestinationLayout,
    progress_interval: std::time::Duration,
    message: &RemoteMessage,
    item: &MediaItem,
    index: usize,
) -> Result<PathBuf> {
    let dir = layout.ensure_dir(item.kind)?;
    let temp_path = dir.join(naming::temp_file_name(index, &item.extension));

    let mut reporter = ProgressReporter::stdout(progress_interval);
    port.download_media(message, &temp_path, &mut |current: u64, total: u64| {
        reporter.update(current, total);
    })
    .await?;

    naming::finalize(&temp_path)
}
