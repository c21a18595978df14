use crate::classifier::LineClassifier;
use crate::types::*;
use std::collections::BTreeMap;
use tracing::debug;

/// A line the validator removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedLine {
    pub line: String,
    pub category: NoiseCategory,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub text: String,
    pub kept_lines: usize,
    pub dropped: Vec<DroppedLine>,
    /// Every line was noise; `text` is the first original line
    pub fell_back: bool,
}

impl ValidationReport {
    pub fn dropped_by_category(&self) -> BTreeMap<NoiseCategory, usize> {
        let mut counts = BTreeMap::new();
        for dropped in &self.dropped {
            *counts.entry(dropped.category).or_insert(0) += 1;
        }
        counts
    }
}

/// Deterministic second pass over rewritten text. Re-runs the noise rules
/// line by line and keeps everything else verbatim; repairs are not applied
/// here.
pub struct Validator<'a> {
    classifier: &'a LineClassifier,
}

impl<'a> Validator<'a> {
    pub fn new(classifier: &'a LineClassifier) -> Self {
        Self { classifier }
    }

    pub fn validate(&self, text: &str) -> String {
        self.validate_with_report(text).text
    }

    pub fn validate_with_report(&self, text: &str) -> ValidationReport {
        let body = text.trim();
        if body.is_empty() {
            return ValidationReport {
                text: text.to_string(),
                kept_lines: 0,
                dropped: Vec::new(),
                fell_back: false,
            };
        }

        // Blank lines count toward the chunk size, as in the rewritten text
        let lines: Vec<&str> = body.lines().collect();
        let mut kept = Vec::new();
        let mut dropped = Vec::new();

        for (i, raw_line) in lines.iter().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let context = LineContext::at(&lines, i);
            match self.classifier.detect_noise(line, &context) {
                Some(category) => dropped.push(DroppedLine {
                    line: line.to_string(),
                    category,
                }),
                None => kept.push(line),
            }
        }

        if !dropped.is_empty() {
            debug!(
                kept = kept.len(),
                dropped = dropped.len(),
                "validator removed residual noise"
            );
        }

        if kept.is_empty() {
            // never hand back an empty chunk; the first line is the least bad guess
            let first = lines.first().map(|l| l.trim()).unwrap_or_default();
            debug!(line = first, "validator dropped every line, keeping the first");
            return ValidationReport {
                text: first.to_string(),
                kept_lines: 1,
                dropped,
                fell_back: true,
            };
        }

        ValidationReport {
            text: kept.join("\n"),
            kept_lines: kept.len(),
            dropped,
            fell_back: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_validator<F: FnOnce(&Validator)>(f: F) {
        let classifier = LineClassifier::new().unwrap();
        let validator = Validator::new(&classifier);
        f(&validator);
    }

    #[test]
    fn test_removes_residual_noise() {
        with_validator(|v| {
            let text = "14:07\n94\n易方达蓝筹精选混合\n\n持有金额 12,345.67\n25.12.31\n尾号1234";
            assert_eq!(v.validate(text), "易方达蓝筹精选混合\n持有金额 12,345.67");
        });
    }

    #[test]
    fn test_kept_lines_are_not_repaired() {
        with_validator(|v| {
            assert_eq!(v.validate("基金A\n279.411.6"), "基金A\n279.411.6");
        });
    }

    #[test]
    fn test_falls_back_to_first_line() {
        with_validator(|v| {
            let report = v.validate_with_report("  14:07  \n92\n-2");
            assert!(report.fell_back);
            assert_eq!(report.text, "14:07");
            assert_eq!(report.dropped.len(), 3);
        });
    }

    #[test]
    fn test_blank_input_is_returned_unchanged() {
        with_validator(|v| {
            assert_eq!(v.validate("  \n "), "  \n ");
        });
    }

    #[test]
    fn test_report_counts_categories() {
        with_validator(|v| {
            let report = v.validate_with_report("9.00%\n6.00%\n本基金 -1.17%\n14:07");
            let counts = report.dropped_by_category();
            assert_eq!(counts.get(&NoiseCategory::AxisPercentTick), Some(&2));
            assert_eq!(counts.get(&NoiseCategory::StatusBarClock), Some(&1));
            assert_eq!(report.text, "本基金 -1.17%");
        });
    }

    #[test]
    fn test_single_percentage_survives() {
        with_validator(|v| {
            assert_eq!(v.validate("+1.49%"), "+1.49%");
        });
    }

    #[test]
    fn test_extra_pattern_keeps_lines_that_only_contain_it() {
        use crate::rules::NoiseRuleSet;

        let rules = NoiseRuleSet::with_extra_patterns(&["晒收益".to_string()]).unwrap();
        let classifier = LineClassifier::with_rules(rules).unwrap();
        let validator = Validator::new(&classifier);
        assert_eq!(
            validator.validate("易方达蓝筹精选混合\n晒收益\n晒收益率 12.35%"),
            "易方达蓝筹精选混合\n晒收益率 12.35%"
        );
    }
}
