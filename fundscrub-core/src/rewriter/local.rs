use super::{RewriteRequest, Rewriter};
use crate::classifier::LineClassifier;
use crate::error::Result;
use tracing::debug;

/// Offline stand-in for the rewriting service. Applies the deterministic
/// classifier: noise lines go, repairs are applied, order is kept. It only
/// knows the detectable part of the taxonomy.
pub struct LocalRewriter<'a> {
    classifier: &'a LineClassifier,
}

impl<'a> LocalRewriter<'a> {
    pub fn new(classifier: &'a LineClassifier) -> Self {
        Self { classifier }
    }
}

impl<'a> Rewriter for LocalRewriter<'a> {
    fn rewrite(&self, request: &RewriteRequest<'_>) -> Result<String> {
        let body = request.raw_text.trim();
        let lines: Vec<&str> = body.lines().collect();

        let kept: Vec<String> = self
            .classifier
            .classify_chunk(&lines)
            .into_iter()
            .filter_map(|(line, class)| class.kept_text(line).map(str::to_string))
            .collect();

        debug!(
            chunk = request.chunk_index,
            lines_in = lines.len(),
            lines_out = kept.len(),
            "local rewrite"
        );
        Ok(kept.join("\n"))
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(raw: &str) -> String {
        let classifier = LineClassifier::new().unwrap();
        let rewriter = LocalRewriter::new(&classifier);
        let request = RewriteRequest {
            chunk_index: 1,
            raw_text: raw,
            prompt: String::new(),
        };
        rewriter.rewrite(&request).unwrap()
    }

    #[test]
    fn test_drops_noise_and_repairs() {
        let raw = "14:07\n三小92\n· 股票型均值\n279.411.6\n业绩比较基准▼\n25.12.31";
        // "三小92" is status-bar residue the rules cannot see; it survives offline
        assert_eq!(rewrite(raw), "三小92\n股票型均值\n279,411.60\n业绩比较基准");
    }

    #[test]
    fn test_all_noise_gives_empty_text() {
        assert_eq!(rewrite("14:07\n92"), "");
    }
}
