use crate::classifier::LineClassifier;
use crate::error::Result;
use crate::prompt::InstructionSet;
use crate::rewriter::{RewriteRequest, Rewriter};
use crate::types::ChunkStatus;
use crate::validator::{ValidationReport, Validator};
use tracing::{debug, info};

/// What happened to one chunk
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub text: String,
    pub status: ChunkStatus,
    /// None for passthrough chunks
    pub validation: Option<ValidationReport>,
}

/// Cleans one chunk: a single rewrite followed by the validator pass.
///
/// Rewriter errors are returned as-is; deciding what a failed chunk turns
/// into is the assembler's job.
pub struct ChunkCleaner<'a> {
    rewriter: &'a dyn Rewriter,
    validator: Validator<'a>,
    instructions: &'a InstructionSet,
}

impl<'a> ChunkCleaner<'a> {
    pub fn new(
        rewriter: &'a dyn Rewriter,
        classifier: &'a LineClassifier,
        instructions: &'a InstructionSet,
    ) -> Self {
        Self {
            rewriter,
            validator: Validator::new(classifier),
            instructions,
        }
    }

    pub fn rewriter_name(&self) -> &str {
        self.rewriter.name()
    }

    pub fn instructions(&self) -> &InstructionSet {
        self.instructions
    }

    pub fn clean_chunk(&self, raw: &str) -> Result<String> {
        self.clean_chunk_at(1, raw).map(|outcome| outcome.text)
    }

    /// `index` is 1-based and only used for logging and reports
    pub fn clean_chunk_at(&self, index: usize, raw: &str) -> Result<ChunkOutcome> {
        if raw.trim().is_empty() {
            return Ok(ChunkOutcome {
                text: raw.to_string(),
                status: ChunkStatus::Passthrough,
                validation: None,
            });
        }

        let request = RewriteRequest {
            chunk_index: index,
            raw_text: raw,
            prompt: self.instructions.render(raw),
        };
        let response = self.rewriter.rewrite(&request)?;

        let rewritten = match response.trim() {
            "" => {
                info!(chunk = index, "empty rewrite, keeping the raw chunk");
                raw
            }
            text => text,
        };

        let report = self.validator.validate_with_report(rewritten);
        debug!(
            chunk = index,
            rewriter = self.rewriter.name(),
            kept = report.kept_lines,
            validator_dropped = report.dropped.len(),
            "chunk cleaned"
        );

        Ok(ChunkOutcome {
            text: report.text.clone(),
            status: ChunkStatus::Cleaned,
            validation: Some(report),
        })
    }
}
