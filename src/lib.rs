//! previewbox: the live preview sandbox of a browser-based code editor
//!
//! Takes user-authored HTML/CSS/JavaScript fragments, executes the script
//! in an isolated execution realm, and relays console output and runtime
//! errors back to the host over a single one-directional message channel,
//! without granting the untrusted code any access to host state.
//!
//! # Architecture
//!
//! Components, leaves first:
//!
//! - [`document`]: synthesizes one self-contained markup document from the
//!   source fragments plus the fixed instrumentation script
//! - [`realm`]: the execution sandbox, a worker thread owning a fresh
//!   JavaScript engine context, replaced wholesale every render cycle
//! - [`instrument`]: the harness injected into every fresh realm; wraps
//!   the console entry points and forwards errors and rejections
//! - [`bridge`]: host-side envelope consumer; accepts messages only from
//!   the current realm's transport-level handle
//! - [`console`]: ordered record aggregator with error-triggered expansion
//!   and derived badge counts
//! - [`host`]: render lifecycle, fail-closed setup handling, message pump
//!
//! # Design Principles
//!
//! 1. **Structural isolation** - the boundary is the realm and its
//!    capability set, never content filtering
//! 2. **One-way flow** - information crosses the boundary low-trust to
//!    high-trust only; no host state reaches the sandbox
//! 3. **Identity over payload** - the bridge trusts the transport-level
//!    sender handle, never a payload field
//! 4. **Fail closed** - a render that cannot set up shows an explicit
//!    retryable error, never a stale or partial document
//! 5. **Contained failures** - sandbox-side errors reach the host only
//!    through the message protocol; nothing here panics the host

pub mod bridge;
pub mod config;
pub mod console;
pub mod document;
pub mod host;
pub mod instrument;
pub mod realm;
pub mod types;

pub use bridge::protocol::{ConsoleMethod, Envelope, RelayMessage};
pub use bridge::MessageBridge;
pub use config::{PreviewConfig, SandboxCapabilities};
pub use console::ConsoleAggregator;
pub use host::PreviewHost;
pub use realm::{Realm, RealmHandle};
pub use types::{ConsoleKind, ConsoleRecord, ErrorBanner, PreviewError, PreviewSource, Result};
