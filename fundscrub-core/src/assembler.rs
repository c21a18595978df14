//! Document-level orchestration
//!
//! ```text
//! raw document
//!     ↓ split_document
//! header anchor? | chunk 1 | chunk 2 | ... | footer anchor?
//!                     ↓ ChunkCleaner (sequential, or a bounded rayon pool)
//! header anchor? | cleaned 1 | cleaned 2 | ... | footer anchor?
//!     ↓ join
//! cleaned document
//! ```
//!
//! Anchors never reach the rewriter. A chunk that fails is replaced by the
//! configured failure marker; the other chunks are unaffected.

use crate::cleaner::{ChunkCleaner, ChunkOutcome};
use crate::config::DocumentConfig;
use crate::error::Result;
use crate::types::*;
use chrono::Utc;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A document broken into its anchors and chunk bodies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDocument {
    pub header: Option<String>,
    pub footer: Option<String>,
    /// Trimmed, non-empty chunk bodies in document order
    pub chunks: Vec<String>,
}

pub fn split_document(raw: &str, config: &DocumentConfig) -> SplitDocument {
    let mut lines: Vec<&str> = raw.trim().split('\n').collect();
    let is_anchor = |line: &str| line.starts_with(config.anchor_prefix.as_str());

    let mut header = None;
    if lines.first().is_some_and(|line| is_anchor(line)) {
        header = Some(lines.remove(0).to_string());
    }
    let mut footer = None;
    if lines.last().is_some_and(|line| is_anchor(line)) {
        footer = lines.pop().map(str::to_string);
    }

    let body = lines.join("\n");
    let chunks = body
        .trim()
        .split(config.delimiter.as_str())
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect();

    SplitDocument {
        header,
        footer,
        chunks,
    }
}

/// Inverse of [`split_document`]: chunks separated by the delimiter on its own
/// line between blank lines, anchors set off by one blank line.
pub fn join_document(
    header: Option<&str>,
    chunks: &[String],
    footer: Option<&str>,
    config: &DocumentConfig,
) -> String {
    let separator = format!("\n\n{}\n\n", config.delimiter);
    let mut result = chunks.join(&separator);

    if let Some(header) = header {
        result = format!("{header}\n\n{result}");
    }
    if let Some(footer) = footer {
        result.push_str("\n\n");
        result.push_str(footer);
    }
    result
}

#[derive(Debug, Clone)]
pub struct CleanedDocument {
    pub text: String,
    pub report: CleanReport,
}

/// Progress callback: (1-based chunk index, chunk count), called as each
/// chunk starts. With concurrency the calls may arrive out of order.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Sync);

pub struct DocumentAssembler<'a> {
    cleaner: ChunkCleaner<'a>,
    config: &'a DocumentConfig,
    max_concurrent_chunks: usize,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(cleaner: ChunkCleaner<'a>, config: &'a DocumentConfig) -> Self {
        Self {
            cleaner,
            config,
            max_concurrent_chunks: 1,
            progress: None,
        }
    }

    /// Upper bound on chunks in flight. 1 (the default) is strictly sequential.
    pub fn with_concurrency(mut self, max_concurrent_chunks: usize) -> Self {
        self.max_concurrent_chunks = max_concurrent_chunks.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn clean_document(&self, raw: &str) -> String {
        self.clean_document_with_report(raw).text
    }

    pub fn clean_document_with_report(&self, raw: &str) -> CleanedDocument {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let split = split_document(raw, self.config);

        info!(
            %run_id,
            chunks = split.chunks.len(),
            header = split.header.is_some(),
            footer = split.footer.is_some(),
            rewriter = self.cleaner.rewriter_name(),
            "cleaning document"
        );

        let results = self.run_chunks(&split.chunks);

        let mut cleaned = Vec::with_capacity(results.len());
        let mut chunk_reports = Vec::with_capacity(results.len());
        for (i, (raw_chunk, result)) in split.chunks.iter().zip(results).enumerate() {
            let (text, report) = self.settle_chunk(i + 1, raw_chunk, result);
            cleaned.push(text);
            chunk_reports.push(report);
        }

        let text = join_document(
            split.header.as_deref(),
            &cleaned,
            split.footer.as_deref(),
            self.config,
        );

        let report = CleanReport {
            run_id,
            started_at,
            rewriter: self.cleaner.rewriter_name().to_string(),
            instructions_digest: self.cleaner.instructions().digest().to_string(),
            header: split.header,
            footer: split.footer,
            chunks: chunk_reports,
            original_chars: raw.chars().count(),
            cleaned_chars: text.chars().count(),
        };

        info!(
            %run_id,
            failed = report.failed_chunks(),
            reduction_percent = report.reduction_percent(),
            "document cleaned"
        );

        CleanedDocument { text, report }
    }

    /// Results come back in chunk order whatever order they finish in
    fn run_chunks(&self, chunks: &[String]) -> Vec<Result<ChunkOutcome>> {
        let total = chunks.len();
        let clean_one = |(i, chunk): (usize, &String)| {
            let index = i + 1;
            if let Some(progress) = self.progress {
                progress(index, total);
            }
            self.cleaner.clean_chunk_at(index, chunk)
        };

        let workers = self.max_concurrent_chunks.min(total);
        if workers <= 1 {
            return chunks.iter().enumerate().map(clean_one).collect();
        }

        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(|| {
                chunks
                    .par_iter()
                    .enumerate()
                    .map(clean_one)
                    .collect::<Vec<_>>()
            }),
            Err(e) => {
                warn!(error = %e, "cannot start chunk workers, cleaning sequentially");
                chunks.iter().enumerate().map(clean_one).collect()
            }
        }
    }

    fn settle_chunk(
        &self,
        index: usize,
        raw_chunk: &str,
        result: Result<ChunkOutcome>,
    ) -> (String, ChunkReport) {
        let input_lines = raw_chunk.lines().count();

        match result {
            Ok(outcome) => {
                let (dropped_by_validator, validator_fell_back) = match &outcome.validation {
                    Some(validation) => (validation.dropped_by_category(), validation.fell_back),
                    None => (BTreeMap::new(), false),
                };
                let report = ChunkReport {
                    index,
                    status: outcome.status,
                    input_lines,
                    output_lines: outcome.text.lines().count(),
                    dropped_by_validator,
                    validator_fell_back,
                };
                (outcome.text, report)
            }
            Err(err) => {
                if err.is_per_chunk() {
                    warn!(chunk = index, error = %err, "chunk cleaning failed, inserting marker");
                } else {
                    error!(chunk = index, error = %err, "unexpected error while cleaning chunk, inserting marker");
                }
                let marker = self.config.failure_marker_for(index);
                let report = ChunkReport {
                    index,
                    status: ChunkStatus::Failed {
                        error: err.to_string(),
                    },
                    input_lines,
                    output_lines: marker.lines().count(),
                    dropped_by_validator: BTreeMap::new(),
                    validator_fell_back: false,
                };
                (marker, report)
            }
        }
    }
}
