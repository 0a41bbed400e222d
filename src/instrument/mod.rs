//! Instrumentation layer
//!
//! The JavaScript injected into every synthesized document, and the guard
//! that wraps the user script. Injection happens once per fresh execution
//! realm: decorate-on-load, never a persistent mutation of shared state,
//! since the whole realm is discarded on every render cycle.

/// The instrumentation harness: console wrappers, the inline-error
/// reporter and unhandled-rejection tracking.
pub fn harness() -> &'static str {
    include_str!("harness.js")
}

/// Wrap the user script so a synchronous throw cannot abort anything that
/// precedes it; the throw is forwarded as an `error` relay message with
/// source `inline` instead.
pub fn guarded_script(user_script: &str) -> String {
    format!(
        "try {{\n{user_script}\n}} catch (err) {{ __preview_report_inline(err); }}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_defines_relay_entry_points() {
        let harness = harness();
        assert!(harness.contains("__preview_post"));
        assert!(harness.contains("__preview_report_inline"));
        assert!(harness.contains("__preview_flush_rejections"));
        for method in ["\"log\"", "\"warn\"", "\"info\"", "\"error\""] {
            assert!(harness.contains(method), "missing console method {method}");
        }
    }

    #[test]
    fn guard_wraps_user_script_verbatim() {
        let guarded = guarded_script("console.log('hi')");
        assert!(guarded.starts_with("try {"));
        assert!(guarded.contains("console.log('hi')"));
        assert!(guarded.contains("__preview_report_inline(err)"));
    }
}
