//! Generative rewriting stage
//!
//! This module defines the boundary between the rule-governed rewrite of a
//! chunk (an external language service) and the deterministic validation that
//! follows it. Everything behind the boundary is swappable: the HTTP client in
//! production, the local rule-based rewriter offline, and closures in tests.
//!
//! ```text
//! raw chunk + InstructionSet
//!     ↓
//! RewriteRequest
//!     ↓
//! [Rewriter] (ChatCompletionsClient | LocalRewriter | closure)
//!     ↓
//! rewritten text → Validator
//! ```

pub mod local;

#[cfg(feature = "http-client")]
pub mod chat;

use crate::error::Result;

pub use local::LocalRewriter;

#[cfg(feature = "http-client")]
pub use chat::ChatCompletionsClient;

/// One single-turn rewrite of one chunk
#[derive(Debug, Clone)]
pub struct RewriteRequest<'a> {
    /// 1-based chunk number, for logging
    pub chunk_index: usize,
    pub raw_text: &'a str,
    /// Instructions with the raw text interpolated; sent as the only user message
    pub prompt: String,
}

/// Rewrites one chunk according to the instruction contract.
///
/// Implementations make exactly one attempt; failures go back to the caller.
pub trait Rewriter: Send + Sync {
    fn rewrite(&self, request: &RewriteRequest<'_>) -> Result<String>;

    /// Name for logs and reports
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> Rewriter for F
where
    F: Fn(&RewriteRequest<'_>) -> Result<String> + Send + Sync,
{
    fn rewrite(&self, request: &RewriteRequest<'_>) -> Result<String> {
        self(request)
    }

    fn name(&self) -> &str {
        "closure"
    }
}
