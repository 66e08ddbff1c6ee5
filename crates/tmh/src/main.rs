//! `tmh` CLI - harvest photos, videos and files from Telegram links

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::error;

use tmh_core::{
    config::{session_path, HarvestConfig},
    harvest::{HarvestReport, Harvester, Outcome, RunOptions},
    link::{self, LinkKind},
};
use tmh_telegram::{ConsoleChallenge, TelegramClient};

/// Prefix of the machine-readable result line printed with `--json`.
const RESULT_PREFIX: &str = "__RESULT__";

#[derive(Parser)]
#[command(name = "tmh")]
#[command(about = "Download media reachable from a Telegram link")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a bot with a deep link and follow its inline pagination
    Bot {
        #[command(flatten)]
        common: CommonArgs,

        /// Maximum pages to process (0 = unlimited)
        #[arg(long, default_value = "100")]
        max_pages: u32,

        /// Wait after /start before reading replies, in milliseconds
        #[arg(long)]
        reply_wait_ms: Option<u64>,

        /// Wait after each page click, in milliseconds
        #[arg(long)]
        click_wait_ms: Option<u64>,
    },

    /// Download media from the comments of a channel post
    Comments {
        #[command(flatten)]
        common: CommonArgs,

        /// Resume from the N-th media comment (1-based)
        #[arg(long, default_value = "1")]
        start_from: usize,
    },

    /// Download media from a forum topic
    Topic {
        #[command(flatten)]
        common: CommonArgs,

        /// Resume from the N-th media message (1-based)
        #[arg(long, default_value = "1")]
        start_from: usize,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// t.me link to harvest
    url: String,

    /// Telegram API id (my.telegram.org)
    #[arg(long, env = "TMH_API_ID")]
    api_id: i32,

    /// Telegram API hash
    #[arg(long, env = "TMH_API_HASH", hide_env_values = true)]
    api_hash: String,

    /// Root output directory
    #[arg(long, default_value = "downloads")]
    out: PathBuf,

    /// Session name (stored as <name>.session)
    #[arg(long, default_value = "downloader")]
    session: String,

    /// Directory holding the session file (default: next to the executable)
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Print the final report as a JSON line prefixed with __RESULT__
    #[arg(long)]
    json: bool,
}

struct Invocation {
    common: CommonArgs,
    kind: LinkKind,
    options: RunOptions,
    reply_wait: Option<Duration>,
    click_wait: Option<Duration>,
}

impl Commands {
    fn into_invocation(self) -> Invocation {
        match self {
            Commands::Bot {
                common,
                max_pages,
                reply_wait_ms,
                click_wait_ms,
            } => Invocation {
                common,
                kind: LinkKind::Bot,
                options: RunOptions {
                    max_pages,
                    ..RunOptions::default()
                },
                reply_wait: reply_wait_ms.map(Duration::from_millis),
                click_wait: click_wait_ms.map(Duration::from_millis),
            },
            Commands::Comments { common, start_from } => Invocation {
                common,
                kind: LinkKind::ChannelPost,
                options: RunOptions {
                    start_from,
                    ..RunOptions::default()
                },
                reply_wait: None,
                click_wait: None,
            },
            Commands::Topic { common, start_from } => Invocation {
                common,
                kind: LinkKind::Topic,
                options: RunOptions {
                    start_from,
                    ..RunOptions::default()
                },
                reply_wait: None,
                click_wait: None,
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = tmh_core::logging::init("tmh") {
        eprintln!("logging setup failed: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli.command.into_invocation()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(inv: Invocation) -> Result<HarvestReport> {
    let mut config = HarvestConfig::from_env().context("loading configuration")?;
    if let Some(d) = inv.reply_wait {
        config.reply_settle = d;
    }
    if let Some(d) = inv.click_wait {
        config.click_settle = d;
    }

    let target = link::parse(&inv.common.url, inv.kind)?;

    let session = session_path(inv.common.session_dir.as_deref(), &inv.common.session);
    ensure_parent(&session)?;

    let client = TelegramClient::connect(inv.common.api_id, &inv.common.api_hash, &session)
        .await
        .context("connecting to Telegram")?;
    client
        .ensure_authorized(&ConsoleChallenge::stdin())
        .await
        .context("logging in")?;

    let result = Harvester::new(&client, config)
        .run(&target, inv.options, &inv.common.out)
        .await;
    // Keep whatever the session learned even when the run failed.
    client.save_session().context("saving session")?;
    let report = result?;

    print_summary(&report);
    if inv.common.json {
        println!("{RESULT_PREFIX}{}", serde_json::to_string(&report)?);
    }
    Ok(report)
}

fn ensure_parent(session: &Path) -> Result<()> {
    if let Some(dir) = session.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating session directory {}", dir.display()))?;
    }
    Ok(())
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Done => "no more pages".to_string(),
        Outcome::Stalled => "bot sent nothing new".to_string(),
        Outcome::PageLimit => "page limit reached".to_string(),
        Outcome::Completed => "all items processed".to_string(),
        Outcome::NoComments => "post not found or has no comments".to_string(),
        Outcome::NoContent => "no media found".to_string(),
        Outcome::OffsetBeyondEnd {
            start_from,
            available,
        } => format!("start offset {start_from} is past the last of {available} items"),
    }
}

fn print_summary(report: &HarvestReport) {
    println!("\n==== finished ({}) ====", describe(&report.outcome));
    println!("downloaded: {}", report.total_downloaded);
    if report.failed > 0 {
        println!("failed: {}", report.failed);
    }
    println!("saved to: {}", report.destination.display());
}
