//! Relay wire protocol
//!
//! Structured payloads sent sandbox→host only; there are no host→sandbox
//! messages. A message exists only transiently on the channel and is
//! consumed exactly once by the bridge.

use crate::realm::RealmHandle;
use crate::types::ConsoleKind;
use serde::{Deserialize, Serialize};

/// Source label for errors thrown synchronously by the user script.
pub const SOURCE_INLINE: &str = "inline";
/// Source label for uncaught errors raised after document load.
pub const SOURCE_GLOBAL: &str = "global";
/// Source label for promise rejections that settled with no handler.
pub const SOURCE_PROMISE: &str = "promise";

/// Console entry point a `console` relay message originated from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleMethod {
    Log,
    Warn,
    Info,
    Error,
}

impl ConsoleMethod {
    pub fn into_kind(self) -> ConsoleKind {
        match self {
            ConsoleMethod::Log => ConsoleKind::Log,
            ConsoleMethod::Warn => ConsoleKind::Warn,
            ConsoleMethod::Info => ConsoleKind::Info,
            ConsoleMethod::Error => ConsoleKind::Error,
        }
    }
}

/// Message relayed across the sandbox boundary.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RelayMessage {
    /// A wrapped console entry point fired inside the sandbox.
    Console {
        method: ConsoleMethod,
        args: Vec<String>,
    },
    /// A runtime failure inside the sandbox: synchronous throw, uncaught
    /// error, or unhandled rejection, distinguished by `source`.
    Error {
        message: String,
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

/// Transport envelope around a relay message.
///
/// `sender` is the transport-level identity of the emitting realm,
/// assigned by the realm worker itself, never taken from the payload,
/// since payload fields are user-controlled content.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub sender: RealmHandle,
    pub message: RelayMessage,
}
