//! Configuration and capability policy
//!
//! Host-side knobs for the preview lifecycle plus the fixed capability
//! set granted to every execution sandbox.

use crate::types::{PreviewError, Result};
use serde::{Deserialize, Serialize};

/// Preview host configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Unique identifier for this preview instance
    pub instance_id: String,
    /// Upper bound on waiting for a realm to initialize and load a document
    pub load_timeout_ms: u64,
    /// Engine loop-iteration cap applied to every realm (0 disables the cap)
    pub loop_iteration_limit: u64,
    /// Engine recursion cap applied to every realm
    pub recursion_limit: usize,
    /// Maximum number of console records the aggregator retains
    pub max_records: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            load_timeout_ms: 5_000,
            loop_iteration_limit: 4_000_000,
            recursion_limit: 512,
            max_records: 1_000,
        }
    }
}

impl PreviewConfig {
    /// Reject configurations that would make the host wait forever or
    /// collect nothing.
    pub fn validate(&self) -> Result<()> {
        if self.load_timeout_ms == 0 {
            return Err(PreviewError::Config(
                "load_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.recursion_limit == 0 {
            return Err(PreviewError::Config(
                "recursion_limit must be non-zero".to_string(),
            ));
        }
        if self.max_records == 0 {
            return Err(PreviewError::Config(
                "max_records must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Capability set granted to the execution sandbox.
///
/// Fixed for the product, not configurable per instance: the sandbox may
/// run scripts, access its own origin-scoped document, submit forms, open
/// popups and modal dialogs, but never navigate the top-level page.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SandboxCapabilities {
    pub allow_scripts: bool,
    pub allow_same_origin: bool,
    pub allow_forms: bool,
    pub allow_popups: bool,
    pub allow_modals: bool,
    pub allow_top_navigation: bool,
}

impl SandboxCapabilities {
    /// The fixed capability set used for every preview sandbox.
    pub fn fixed() -> Self {
        Self {
            allow_scripts: true,
            allow_same_origin: true,
            allow_forms: true,
            allow_popups: true,
            allow_modals: true,
            allow_top_navigation: false,
        }
    }

    /// Space-separated token list for the embedding attribute.
    pub fn token_list(&self) -> String {
        let mut tokens = Vec::new();
        if self.allow_scripts {
            tokens.push("allow-scripts");
        }
        if self.allow_same_origin {
            tokens.push("allow-same-origin");
        }
        if self.allow_forms {
            tokens.push("allow-forms");
        }
        if self.allow_popups {
            tokens.push("allow-popups");
        }
        if self.allow_modals {
            tokens.push("allow-modals");
        }
        if self.allow_top_navigation {
            tokens.push("allow-top-navigation");
        }
        tokens.join(" ")
    }
}

impl Default for SandboxCapabilities {
    fn default() -> Self {
        Self::fixed()
    }
}
