use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ===== LINE CLASSIFICATION TYPES =====

/// Named noise pattern. The first group is detected deterministically by the
/// classifier; the rest are only enforced through the instruction text sent to
/// the rewriting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseCategory {
    // Deterministic
    IsolatedGlyph,
    StatusBarClock,
    AxisPercentTick,
    AxisDateTick,
    BankCardSuffix,
    NumericFragment,
    Blank,
    Custom,

    // Instruction-only
    StatusBarResidue,
    UiChrome,
    ActionBar,
    ChartLabel,
    NewsHeadline,
    PromoBanner,
    ExplanationLabel,
    TimestampFooter,
    MarketingCopy,
    NavigationEntry,
    InterpretiveLabel,
}

impl NoiseCategory {
    pub fn label(&self) -> &'static str {
        match self {
            NoiseCategory::IsolatedGlyph => "isolated glyph",
            NoiseCategory::StatusBarClock => "status-bar clock",
            NoiseCategory::AxisPercentTick => "chart percentage tick",
            NoiseCategory::AxisDateTick => "chart date tick",
            NoiseCategory::BankCardSuffix => "bank-card suffix",
            NoiseCategory::NumericFragment => "numeric fragment",
            NoiseCategory::Blank => "blank line",
            NoiseCategory::Custom => "custom pattern",
            NoiseCategory::StatusBarResidue => "status-bar residue",
            NoiseCategory::UiChrome => "UI chrome",
            NoiseCategory::ActionBar => "bottom action bar",
            NoiseCategory::ChartLabel => "chart label",
            NoiseCategory::NewsHeadline => "news headline",
            NoiseCategory::PromoBanner => "promotional banner",
            NoiseCategory::ExplanationLabel => "explanation label",
            NoiseCategory::TimestampFooter => "timestamp footer",
            NoiseCategory::MarketingCopy => "marketing copy",
            NoiseCategory::NavigationEntry => "navigation entry",
            NoiseCategory::InterpretiveLabel => "interpretive label",
        }
    }
}

/// Digit-preserving in-line repair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    LeadingBullet,
    ChartLabelPrefix,
    TrailingDecoration,
    TrailingZero,
    FullWidthComma,
    MalformedSeparators,
    DecimalPadding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineClass {
    Noise,
    Signal,
    SignalRepaired,
}

/// Result of classifying a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Noise {
        category: NoiseCategory,
    },
    Signal,
    SignalRepaired {
        text: String,
        repairs: Vec<RepairKind>,
    },
}

impl Classification {
    pub fn class(&self) -> LineClass {
        match self {
            Classification::Noise { .. } => LineClass::Noise,
            Classification::Signal => LineClass::Signal,
            Classification::SignalRepaired { .. } => LineClass::SignalRepaired,
        }
    }

    pub fn is_noise(&self) -> bool {
        matches!(self, Classification::Noise { .. })
    }

    /// Text to keep for this line, or None when the line is dropped.
    /// `line` must be the (trimmed) line that was classified.
    pub fn kept_text<'a>(&'a self, line: &'a str) -> Option<&'a str> {
        match self {
            Classification::Noise { .. } => None,
            Classification::Signal => Some(line),
            Classification::SignalRepaired { text, .. } => Some(text.as_str()),
        }
    }
}

/// Where a line sits inside its chunk
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub lines_before: &'a [&'a str],
    pub lines_after: &'a [&'a str],
    /// Number of lines in the chunk, blank lines included
    pub total_chunk_size: usize,
}

impl<'a> LineContext<'a> {
    pub fn at(lines: &'a [&'a str], index: usize) -> Self {
        let index = index.min(lines.len());
        let after_start = (index + 1).min(lines.len());
        Self {
            lines_before: &lines[..index],
            lines_after: &lines[after_start..],
            total_chunk_size: lines.len(),
        }
    }

    /// Context for a line classified on its own, as a one-line chunk
    pub fn standalone() -> Self {
        Self {
            lines_before: &[],
            lines_after: &[],
            total_chunk_size: 1,
        }
    }

    pub fn previous_line(&self) -> Option<&'a str> {
        self.lines_before.last().copied()
    }
}

// ===== RUN REPORT TYPES =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkStatus {
    /// Sent to the rewriting service and validated
    Cleaned,
    /// Blank chunk, returned unchanged without a service call
    Passthrough,
    /// Service call failed; the chunk was replaced by the failure marker
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkReport {
    /// 1-based position in the document
    pub index: usize,
    #[serde(flatten)]
    pub status: ChunkStatus,
    pub input_lines: usize,
    pub output_lines: usize,
    /// Lines the validator removed after the rewriting step
    pub dropped_by_validator: BTreeMap<NoiseCategory, usize>,
    /// Validator discarded everything and kept the first original line
    pub validator_fell_back: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub rewriter: String,
    /// SHA-256 of the instruction template sent with every chunk
    pub instructions_digest: String,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub chunks: Vec<ChunkReport>,
    pub original_chars: usize,
    pub cleaned_chars: usize,
}

impl CleanReport {
    pub fn failed_chunks(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| matches!(c.status, ChunkStatus::Failed { .. }))
            .count()
    }

    /// Share of characters removed, in percent
    pub fn reduction_percent(&self) -> f64 {
        if self.original_chars == 0 {
            return 0.0;
        }
        (1.0 - self.cleaned_chars as f64 / self.original_chars as f64) * 100.0
    }
}
