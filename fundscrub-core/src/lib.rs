// Fundscrub Core Library
//
// Cleans OCR text captured from fund app screenshots. A document is split
// into per-screenshot chunks, each chunk is rewritten under a fixed noise
// taxonomy, and the result is re-checked line by line before reassembly.

pub mod types;
pub mod error;
pub mod config;
pub mod rules;
pub mod classifier;
pub mod validator;
pub mod prompt;
pub mod rewriter;
pub mod cleaner;
pub mod assembler;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{CleanError, Result};
pub use config::{CleanerConfig, CleaningConfig, DocumentConfig, ServiceConfig};
pub use classifier::LineClassifier;
pub use validator::{ValidationReport, Validator};
pub use prompt::InstructionSet;
pub use rewriter::{LocalRewriter, RewriteRequest, Rewriter};
pub use cleaner::{ChunkCleaner, ChunkOutcome};
pub use assembler::{join_document, split_document, CleanedDocument, DocumentAssembler, SplitDocument};

#[cfg(feature = "http-client")]
pub use rewriter::ChatCompletionsClient;
