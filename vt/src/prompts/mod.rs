//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for answer generation.
//!
//! Template loading chain:
//! 1. `.vetted/prompts/{name}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{AdaptContext, GenerateContext, PromptLoader, RegenerateContext};
