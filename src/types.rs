/// Core types and structures for the previewbox system
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;

/// Source fragments supplied by the editor for one render cycle.
///
/// The preview does not own this data; it is treated as an immutable
/// snapshot per render cycle. Empty fragments are valid.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviewSource {
    /// User-authored markup body
    pub markup: String,
    /// User-authored stylesheet
    pub stylesheet: String,
    /// User-authored script, executed inside the sandbox realm
    pub script: String,
}

/// Classification of a console record
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleKind {
    Log,
    Warn,
    Info,
    Error,
}

/// Display-ready record produced by the message bridge.
///
/// Insertion order equals arrival order of the underlying relay messages;
/// interleaving reflects real execution order inside the sandbox.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsoleRecord {
    pub kind: ConsoleKind,
    pub text: String,
    pub captured_at: SystemTime,
}

impl ConsoleRecord {
    pub fn new(kind: ConsoleKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            captured_at: SystemTime::now(),
        }
    }
}

/// Coarse top-level "something is broken" signal for the preview surface.
///
/// Distinct from the console log: every relayed error is reported to both,
/// and clearing the console never touches the banner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorBanner {
    message: Option<String>,
}

impl ErrorBanner {
    pub fn set(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    pub fn is_set(&self) -> bool {
        self.message.is_some()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Custom error types for previewbox
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Realm error: {0}")]
    Realm(String),

    #[error("Render timed out after {0}ms")]
    RenderTimeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for previewbox operations
pub type Result<T> = std::result::Result<T, PreviewError>;
