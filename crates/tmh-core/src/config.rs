use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Largest page Telegram serves for a history or replies request.
pub const MAX_PAGE: usize = 100;

/// Tunables for one harvest run.
///
/// The settle delays stand in for a completion signal the remote bot never
/// sends, so they are plain waits rather than polls.
#[derive(Clone, Debug)]
pub struct HarvestConfig {
    /// Wait after sending `/start <param>` before the first fetch.
    pub reply_settle: Duration,
    /// Wait after clicking a next-page button.
    pub click_settle: Duration,
    /// How many recent messages the bot flow inspects per page.
    pub recent_window: usize,
    /// Batch size for cursor pagination (comments / topics).
    pub batch_size: usize,
    /// Minimum spacing between two progress lines of the same transfer.
    pub progress_interval: Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            reply_settle: Duration::from_secs(5),
            click_settle: Duration::from_secs(4),
            recent_window: 50,
            batch_size: 100,
            progress_interval: Duration::from_millis(300),
        }
    }
}

impl HarvestConfig {
    /// Defaults overlaid with `TMH_*` environment variables (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let defaults = Self::default();
        let cfg = Self {
            reply_settle: env_u64("TMH_REPLY_SETTLE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.reply_settle),
            click_settle: env_u64("TMH_CLICK_SETTLE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.click_settle),
            recent_window: env_usize("TMH_RECENT_WINDOW").unwrap_or(defaults.recent_window),
            batch_size: env_usize("TMH_BATCH_SIZE").unwrap_or(defaults.batch_size),
            progress_interval: env_u64("TMH_PROGRESS_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.progress_interval),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.recent_window == 0 {
            return Err(Error::Config("TMH_RECENT_WINDOW must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("TMH_BATCH_SIZE must be > 0".to_string()));
        }
        if self.recent_window > MAX_PAGE || self.batch_size > MAX_PAGE {
            return Err(Error::Config(format!(
                "TMH_RECENT_WINDOW and TMH_BATCH_SIZE must be <= {MAX_PAGE}"
            )));
        }
        Ok(())
    }
}

/// Location of the on-disk login session: `<dir>/<name>.session`.
///
/// `dir` defaults to the directory holding the executable, falling back to
/// the working directory.
pub fn session_path(dir: Option<&Path>, name: &str) -> PathBuf {
    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None => env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let file = if name.ends_with(".session") {
        name.to_string()
    } else {
        format!("{name}.session")
    };
    dir.join(file)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}
