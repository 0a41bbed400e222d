//! Preview host
//!
//! Orchestrates the render lifecycle: synthesize the document, replace the
//! execution realm wholesale, retarget the bridge, load, and pump relayed
//! messages. All failures are contained: nothing in this module panics
//! the host application, and realm-side failures only ever arrive through
//! the message protocol.

use crate::bridge::protocol::Envelope;
use crate::bridge::MessageBridge;
use crate::config::{PreviewConfig, SandboxCapabilities};
use crate::console::ConsoleAggregator;
use crate::document;
use crate::instrument;
use crate::realm::Realm;
use crate::types::{ErrorBanner, PreviewSource, Result};
use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;

/// Host side of the live preview feature.
///
/// Owns the bridge, the aggregator and the banner exclusively; all of
/// them are mutated only from [`PreviewHost::pump`] on the caller's
/// thread, so no locking is involved.
pub struct PreviewHost {
    config: PreviewConfig,
    capabilities: SandboxCapabilities,
    relay_tx: Sender<Envelope>,
    relay_rx: Receiver<Envelope>,
    bridge: MessageBridge,
    console: ConsoleAggregator,
    banner: ErrorBanner,
    realm: Option<Realm>,
    surface: Option<String>,
    setup_error: Option<String>,
    last_source: Option<PreviewSource>,
}

impl PreviewHost {
    pub fn new(config: PreviewConfig) -> Result<Self> {
        config.validate()?;
        let (relay_tx, relay_rx) = crossbeam_channel::unbounded();
        let console = ConsoleAggregator::new(config.max_records);
        Ok(Self {
            config,
            capabilities: SandboxCapabilities::fixed(),
            relay_tx,
            relay_rx,
            bridge: MessageBridge::new(),
            console,
            banner: ErrorBanner::default(),
            realm: None,
            surface: None,
            setup_error: None,
            last_source: None,
        })
    }

    /// Render one source snapshot. Never panics and never surfaces an
    /// error to the caller: setup failures fail closed into an explicit
    /// retryable error state with the preview surface hidden.
    pub fn render(&mut self, source: &PreviewSource) {
        self.last_source = Some(source.clone());
        if let Err(err) = self.try_render(source) {
            log::error!("render failed closed: {err}");
            self.realm = None;
            self.surface = None;
            self.setup_error = Some(err.to_string());
        }
    }

    fn try_render(&mut self, source: &PreviewSource) -> Result<()> {
        log::debug!("[{}] render cycle: replacing realm", self.config.instance_id);
        let surface = document::synthesize(source);

        // Whole-realm replacement: the previous realm's globals, pending
        // work and instrumentation vanish with it before the new document
        // loads. Messages it already posted are filtered out by the
        // bridge's sender check after retargeting.
        self.realm = None;
        let mut realm = Realm::spawn(&self.config, self.relay_tx.clone())?;
        self.bridge.retarget(realm.handle());

        realm.load(
            instrument::harness().to_string(),
            instrument::guarded_script(&source.script),
            Duration::from_millis(self.config.load_timeout_ms),
        )?;

        self.realm = Some(realm);
        self.surface = Some(surface);
        self.setup_error = None;
        // A fresh document starts unbroken; relayed errors from this load
        // set the banner again on the next pump.
        self.banner.clear();
        Ok(())
    }

    /// Re-render the most recent source; the retry affordance after a
    /// fail-closed render. No-op when nothing was rendered yet.
    pub fn retry(&mut self) {
        if let Some(source) = self.last_source.clone() {
            self.render(&source);
        }
    }

    /// Drain pending relay envelopes into the bridge. Returns the number
    /// of envelopes delivered (dropped foreign/stale envelopes are not
    /// counted).
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(envelope) = self.relay_rx.try_recv() {
            if self
                .bridge
                .deliver(envelope, &mut self.console, &mut self.banner)
            {
                delivered += 1;
            }
        }
        delivered
    }

    /// Empty the console log. Does not touch the preview surface or the
    /// error banner.
    pub fn clear_console(&mut self) {
        self.console.clear();
    }

    pub fn console(&self) -> &ConsoleAggregator {
        &self.console
    }

    /// Explicit user toggle for the console panel.
    pub fn set_console_expanded(&mut self, expanded: bool) {
        self.console.set_expanded(expanded);
    }

    pub fn banner(&self) -> &ErrorBanner {
        &self.banner
    }

    /// The currently displayed document, or `None` when the last render
    /// failed closed (the sandbox is hidden rather than stale).
    pub fn surface(&self) -> Option<&str> {
        self.surface.as_deref()
    }

    pub fn setup_error(&self) -> Option<&str> {
        self.setup_error.as_deref()
    }

    /// The live realm, for post-load in-realm activity.
    pub fn realm(&self) -> Option<&Realm> {
        self.realm.as_ref()
    }

    pub fn capabilities(&self) -> &SandboxCapabilities {
        &self.capabilities
    }
}
