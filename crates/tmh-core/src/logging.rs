use std::io::IsTerminal;

use crate::{errors::Error, Result};

/// Initialize logging/tracing for the harvester.
///
/// Logs go to stdout alongside the `__PROGRESS__` lines; consumers split the
/// two streams by prefix.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    // Default: info for our crates, warn for everything else.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,tmh=info,tmh_core=info,tmh_telegram=info,{}=info",
            service_name.replace('-', "_")
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(colour_enabled(&std::io::stdout()))
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install log subscriber: {e}")))?;

    Ok(())
}

/// Colour escapes only when a human is watching; a supervising process parses
/// the same stream for progress lines.
fn colour_enabled(stream: &impl IsTerminal) -> bool {
    stream.is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_colour_when_output_is_not_a_terminal() {
        let file = tempfile::tempfile().unwrap();
        assert!(!colour_enabled(&file));
    }
}
