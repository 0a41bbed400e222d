//! Document synthesizer
//!
//! Builds one complete, self-contained markup document from the three
//! source fragments plus the fixed instrumentation script. No sanitization
//! or escaping of user content is performed: the isolation boundary is
//! structural (the sandbox realm and its capability set), not content
//! filtering.

use crate::instrument;
use crate::types::PreviewSource;

/// Minimal reset applied before the user stylesheet.
pub const RESET_STYLESHEET: &str = "\
html, body { margin: 0; padding: 8px; }\n\
* { box-sizing: border-box; }\n\
body { font-family: system-ui, sans-serif; }";

/// Synthesize the full document for one render cycle.
///
/// Layout: reset stylesheet, user stylesheet, user markup, then a trailing
/// script block containing the instrumentation harness followed by the
/// guarded user script. The harness must precede the user script so a
/// synchronous throw cannot abort instrumentation setup.
pub fn synthesize(source: &PreviewSource) -> String {
    let harness = instrument::harness();
    let guarded = instrument::guarded_script(&source.script);
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <style>\n{reset}\n</style>\n\
         <style>\n{stylesheet}\n</style>\n\
         </head>\n\
         <body>\n\
         {markup}\n\
         <script>\n\
         {harness}\n\
         {guarded}\n\
         </script>\n\
         </body>\n\
         </html>\n",
        reset = RESET_STYLESHEET,
        stylesheet = source.stylesheet,
        markup = source.markup,
        harness = harness,
        guarded = guarded,
    )
}
