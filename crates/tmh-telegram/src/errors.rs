use grammers_mtsender::{InvocationError, RpcError};

use tmh_core::errors::Error;

/// Map a failed MTProto call into the core taxonomy.
///
/// `subject` names what the call was about (`@channel`, a message id, ...)
/// and ends up in the error text.
pub(crate) fn map_invocation(e: InvocationError, subject: &str) -> Error {
    match e {
        InvocationError::Rpc(rpc) => map_rpc(&rpc, subject),
        other => Error::External(format!("telegram error: {other}")),
    }
}

pub(crate) fn map_rpc(rpc: &RpcError, subject: &str) -> Error {
    match rpc.name.as_str() {
        "FLOOD_WAIT" | "FLOOD_PREMIUM_WAIT" => Error::FloodWait {
            seconds: rpc.value.unwrap_or(0),
        },
        "CHANNEL_PRIVATE" | "CHAT_FORBIDDEN" | "CHAT_ADMIN_REQUIRED" | "CHANNEL_INVALID" => {
            Error::PrivateOrForbidden(subject.to_string())
        }
        "USERNAME_NOT_OCCUPIED" | "USERNAME_INVALID" => {
            Error::EntityNotFound(subject.trim_start_matches('@').to_string())
        }
        "AUTH_KEY_UNREGISTERED" | "SESSION_REVOKED" | "USER_DEACTIVATED" => {
            Error::Auth(format!("{} ({subject})", rpc.name))
        }
        _ => Error::External(format!("telegram error {} ({subject}): {rpc}", rpc.code)),
    }
}
