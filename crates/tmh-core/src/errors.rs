/// Core error type for the harvester.
///
/// Adapter crates should map their specific errors into this type so the
/// engine can tell run-level failures apart from per-item ones.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid link: {0}")]
    InvalidLink(String),

    #[error("missing start parameter in bot link")]
    MissingStartParam,

    #[error("message id must be a non-negative integer: {0}")]
    InvalidMessageId(String),

    #[error("entity not found: @{0}")]
    EntityNotFound(String),

    #[error("@{0} is not a channel or group")]
    NotAChannel(String),

    #[error("private or forbidden: {0}")]
    PrivateOrForbidden(String),

    #[error("flood wait: retry after {seconds}s")]
    FloodWait { seconds: u32 },

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Errors that invalidate the whole run even when raised for a single item.
    pub fn is_fatal_for_batch(&self) -> bool {
        matches!(
            self,
            Error::FloodWait { .. } | Error::PrivateOrForbidden(_) | Error::Auth(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
