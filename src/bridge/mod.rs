//! Message bridge
//!
//! Host-side consumer of relay envelopes, attached for the lifetime of
//! the preview feature (not re-attached per render). Converts accepted
//! messages into display-ready console records and drives the error
//! banner.

pub mod protocol;

use crate::console::ConsoleAggregator;
use crate::realm::RealmHandle;
use crate::types::{ConsoleKind, ConsoleRecord, ErrorBanner};
use protocol::{Envelope, RelayMessage};

/// Filters and converts relay envelopes.
#[derive(Debug, Default)]
pub struct MessageBridge {
    current: Option<RealmHandle>,
    dropped: u64,
}

impl MessageBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the accepted sender on a render cycle. Messages still in
    /// flight from the replaced realm will no longer match and are
    /// dropped on delivery.
    pub fn retarget(&mut self, handle: RealmHandle) {
        self.current = Some(handle);
    }

    /// Envelopes dropped because their sender was not the current realm.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Deliver one envelope. Returns `false` when the envelope was
    /// dropped: a message is accepted only if its transport-level sender
    /// equals the current realm's handle. Foreign and stale messages are
    /// a protocol-integrity concern, not a user code concern; they are
    /// never surfaced as errors.
    pub fn deliver(
        &mut self,
        envelope: Envelope,
        console: &mut ConsoleAggregator,
        banner: &mut ErrorBanner,
    ) -> bool {
        if self.current != Some(envelope.sender) {
            self.dropped += 1;
            log::debug!("dropping envelope from non-current realm {}", envelope.sender);
            return false;
        }
        match envelope.message {
            RelayMessage::Console { method, args } => {
                console.push(ConsoleRecord::new(method.into_kind(), args.join(" ")));
            }
            RelayMessage::Error {
                message,
                source,
                line,
                ..
            } => {
                let text = match line {
                    Some(line) => format!("Line {line}: {message}"),
                    None => message.clone(),
                };
                log::debug!("relayed {source} error: {message}");
                console.push(ConsoleRecord::new(ConsoleKind::Error, text));
                // Intentional dual reporting: the banner is the coarse
                // signal, the console record carries the detail.
                banner.set(message);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::ConsoleMethod;

    fn fixture() -> (MessageBridge, ConsoleAggregator, ErrorBanner, RealmHandle) {
        let mut bridge = MessageBridge::new();
        let handle = RealmHandle::new();
        bridge.retarget(handle);
        (bridge, ConsoleAggregator::new(100), ErrorBanner::default(), handle)
    }

    fn console_envelope(sender: RealmHandle, args: &[&str]) -> Envelope {
        Envelope {
            sender,
            message: RelayMessage::Console {
                method: ConsoleMethod::Log,
                args: args.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn args_are_joined_with_single_space() {
        let (mut bridge, mut console, mut banner, handle) = fixture();
        assert!(bridge.deliver(console_envelope(handle, &["a", "b"]), &mut console, &mut banner));
        assert_eq!(console.records().len(), 1);
        assert_eq!(console.records()[0].text, "a b");
        assert_eq!(console.records()[0].kind, ConsoleKind::Log);
    }

    #[test]
    fn foreign_sender_is_dropped_silently() {
        let (mut bridge, mut console, mut banner, _handle) = fixture();
        let stranger = RealmHandle::new();
        assert!(!bridge.deliver(console_envelope(stranger, &["x"]), &mut console, &mut banner));
        assert!(console.records().is_empty());
        assert!(!banner.is_set());
        assert_eq!(bridge.dropped(), 1);
    }

    #[test]
    fn stale_sender_is_dropped_after_retarget() {
        let (mut bridge, mut console, mut banner, old) = fixture();
        let new = RealmHandle::new();
        bridge.retarget(new);
        assert!(!bridge.deliver(console_envelope(old, &["stale"]), &mut console, &mut banner));
        assert!(bridge.deliver(console_envelope(new, &["fresh"]), &mut console, &mut banner));
        assert_eq!(console.records().len(), 1);
        assert_eq!(console.records()[0].text, "fresh");
    }

    #[test]
    fn error_with_line_is_prefixed_and_sets_banner() {
        let (mut bridge, mut console, mut banner, handle) = fixture();
        let envelope = Envelope {
            sender: handle,
            message: RelayMessage::Error {
                message: "x is not defined".to_string(),
                source: protocol::SOURCE_INLINE.to_string(),
                line: Some(3),
                column: Some(1),
                detail: None,
            },
        };
        bridge.deliver(envelope, &mut console, &mut banner);
        assert_eq!(console.records()[0].text, "Line 3: x is not defined");
        assert_eq!(console.records()[0].kind, ConsoleKind::Error);
        assert_eq!(banner.message(), Some("x is not defined"));
    }

    #[test]
    fn error_without_line_keeps_bare_message() {
        let (mut bridge, mut console, mut banner, handle) = fixture();
        let envelope = Envelope {
            sender: handle,
            message: RelayMessage::Error {
                message: "boom".to_string(),
                source: protocol::SOURCE_PROMISE.to_string(),
                line: None,
                column: None,
                detail: Some("unhandledrejection".to_string()),
            },
        };
        bridge.deliver(envelope, &mut console, &mut banner);
        assert_eq!(console.records()[0].text, "boom");
        assert_eq!(banner.message(), Some("boom"));
    }

    #[test]
    fn bridge_without_target_accepts_nothing() {
        let mut bridge = MessageBridge::new();
        let mut console = ConsoleAggregator::new(10);
        let mut banner = ErrorBanner::default();
        let handle = RealmHandle::new();
        assert!(!bridge.deliver(console_envelope(handle, &["x"]), &mut console, &mut banner));
    }
}
