//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Fresh answer prompt
pub const GENERATE: &str = include_str!("../../prompts/generate.pmt");

/// Adapt a cached answer to a similar question
pub const ADAPT: &str = include_str!("../../prompts/adapt.pmt");

/// Regenerate after a rejection
pub const REGENERATE: &str = include_str!("../../prompts/regenerate.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "generate" => Some(GENERATE),
        "adapt" => Some(ADAPT),
        "regenerate" => Some(REGENERATE),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
