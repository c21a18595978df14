use crate::error::Result;
use crate::rules::{digits_preserved, NoiseRuleSet, Repairer};
use crate::types::*;
use tracing::{debug, trace, warn};

/// Decides whether a single line is noise, signal, or signal that needs a
/// cosmetic repair. Stateless: the same line and context always give the
/// same answer.
#[derive(Debug)]
pub struct LineClassifier {
    rules: NoiseRuleSet,
    repairer: Repairer,
}

impl LineClassifier {
    pub fn new() -> Result<Self> {
        Self::with_rules(NoiseRuleSet::builtin()?)
    }

    pub fn with_rules(rules: NoiseRuleSet) -> Result<Self> {
        debug!(
            rules = rules.rule_count(),
            extra_patterns = rules.extra_patterns().len(),
            "noise rules compiled"
        );
        Ok(Self {
            rules,
            repairer: Repairer::new()?,
        })
    }

    pub fn rules(&self) -> &NoiseRuleSet {
        &self.rules
    }

    /// Noise rules only, first match wins. `line` is trimmed first.
    pub fn detect_noise(&self, line: &str, context: &LineContext) -> Option<NoiseCategory> {
        let line = line.trim();
        if line.is_empty() {
            return Some(NoiseCategory::Blank);
        }
        self.rules.detect(line, context)
    }

    pub fn classify(&self, line: &str, context: &LineContext) -> Classification {
        let trimmed = line.trim();

        if let Some(category) = self.detect_noise(trimmed, context) {
            trace!(line = trimmed, category = category.label(), "noise");
            return Classification::Noise { category };
        }

        let repaired = self.repairer.repair(trimmed);
        if repaired.applied.is_empty() {
            return Classification::Signal;
        }

        if !digits_preserved(trimmed, &repaired.text) {
            warn!(
                line = trimmed,
                repaired = %repaired.text,
                "repair would change a figure, keeping the line as is"
            );
            return Classification::Signal;
        }

        trace!(line = trimmed, repaired = %repaired.text, repairs = ?repaired.applied, "repaired");
        Classification::SignalRepaired {
            text: repaired.text,
            repairs: repaired.applied,
        }
    }

    /// Classify every line of a chunk with its position as context
    pub fn classify_chunk<'a>(&self, lines: &'a [&'a str]) -> Vec<(&'a str, Classification)> {
        lines
            .iter()
            .enumerate()
            .map(|(i, &line)| {
                let context = LineContext::at(lines, i);
                (line.trim(), self.classify(line, &context))
            })
            .collect()
    }
}
