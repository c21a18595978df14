use crate::error::{CleanError, Result};
use crate::types::{LineContext, NoiseCategory};
use regex::Regex;

/// Single-character residue left by status-bar and segmentation noise
pub const NOISE_GLYPHS: &[char] = &[
    '>', '<', '^', '￥', 'L', '□', 'D', '®', 'S', '·', ':', 'i', '、', '-', '0', '夫', '大', '贝',
    '聘', '1', '印', '9', '日', '.',
];

pub const BANK_CARD_MARKER: &str = "银行卡尾号";

/// How a rule recognizes its lines
#[derive(Debug, Clone, Copy)]
pub enum Detector {
    /// Line is exactly one character from `NOISE_GLYPHS`
    Glyph,
    /// Whole-line regex
    Pattern(&'static str),
    /// Line contains the substring anywhere
    Contains(&'static str),
    /// Enforced only through the instruction text
    InstructionOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRequirement {
    None,
    /// Only noise when the chunk has more than one line. Chart ticks come in
    /// runs; a lone percentage is taken to be a real figure.
    MultiLineChunk,
}

#[derive(Debug, Clone, Copy)]
pub struct NoiseRule {
    pub category: NoiseCategory,
    pub detector: Detector,
    pub context: ContextRequirement,
    /// Bullet text for the rewriting instructions
    pub instruction: &'static str,
}

// Deterministic rows keep their precedence order: the classifier takes the
// first row that matches.
pub const NOISE_RULES: &[NoiseRule] = &[
    NoiseRule {
        category: NoiseCategory::IsolatedGlyph,
        detector: Detector::Glyph,
        context: ContextRequirement::None,
        instruction: "单独的符号或乱码：",
    },
    NoiseRule {
        category: NoiseCategory::StatusBarClock,
        detector: Detector::Pattern(r"^\d{1,2}[:：]\d{2}\d?$"),
        context: ContextRequirement::None,
        instruction: "状态栏时间：如 14:07、14:081（末尾可能粘连一位数字）",
    },
    NoiseRule {
        category: NoiseCategory::StatusBarResidue,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "状态栏残片：电量数字（如 94、93、92）、汉字残片（三、三小）、粘连残片（三94、三小92）、消息角标数字（单独的 27）",
    },
    NoiseRule {
        category: NoiseCategory::UiChrome,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "UI 按钮：产品详情、产品详情>、晒收益、切换标的、查看收益、什么是专项账户、基金（单独一行作为页面标题时）",
    },
    NoiseRule {
        category: NoiseCategory::ActionBar,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "底部操作栏：赎回/转换、购买/定投、招财号、讨论区、卖出、买入、定投（单独一行时）、完投、赎回、卖卖出、定定投、买、定",
    },
    NoiseRule {
        category: NoiseCategory::ChartLabel,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "业绩图标签行及其粘连变体：单独的 \"业绩走势\"、\"收益明细\"、\"业绩走势收益明细\"、\"业绩走势 收益明细\" 整行删除；\"收益明细 实时估值+X%\" 或 \"业绩走势：收益明细 实时估值+X%\" 只保留 \"实时估值+X%\" 部分",
    },
    NoiseRule {
        category: NoiseCategory::NewsHeadline,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "市场资讯/新闻标题：包括跨行断裂的标题（如 \"拆解公募基金四季报：藏在数据中的七大投\" + 下一行 \"资线索\"）和 \"2025年四季报出炉|易方达主动权益投资业绩亮眼\" 这类标题",
    },
    NoiseRule {
        category: NoiseCategory::AxisPercentTick,
        detector: Detector::Pattern(r"^-?\d+(?:\.\d{1,3})?%$"),
        context: ContextRequirement::MultiLineChunk,
        instruction: "图表 Y 轴刻度：连续出现的纯百分比行（如 9.00% / 6.00% / 3.00%），且前面没有紧跟指标名（本基金/均值/基准/指数名）",
    },
    NoiseRule {
        category: NoiseCategory::AxisDateTick,
        detector: Detector::Pattern(r"^\d{2}\.\d{2}\.\d{2}$"),
        context: ContextRequirement::None,
        instruction: "图表 X 轴日期：25.12.31、26.02.02 这种格式",
    },
    NoiseRule {
        category: NoiseCategory::BankCardSuffix,
        detector: Detector::Contains(BANK_CARD_MARKER),
        context: ContextRequirement::None,
        instruction: "银行卡尾号信息：银行卡尾号、尾号XXXX 等",
    },
    NoiseRule {
        category: NoiseCategory::BankCardSuffix,
        detector: Detector::Pattern(r"^尾号\d{4}$"),
        context: ContextRequirement::None,
        instruction: "",
    },
    NoiseRule {
        category: NoiseCategory::NumericFragment,
        detector: Detector::Pattern(r"^-?\d{1,3}$"),
        context: ContextRequirement::None,
        instruction: "单独的短数字残片：单独一行只有 -2 这种负号+1~3位整数",
    },
    NoiseRule {
        category: NoiseCategory::PromoBanner,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "账户页横幅/提醒语：按策略挑选收益潜力更大的偏股基金、您未持有积蓄型保险，配置锁定长期收益、类似的推荐或提醒横幅",
    },
    NoiseRule {
        category: NoiseCategory::ExplanationLabel,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "单独的 \"说明：\" 行",
    },
    NoiseRule {
        category: NoiseCategory::TimestampFooter,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "末尾时间戳：如 \"2026年2月3日 16:55\" 这种日期+时间格式",
    },
    NoiseRule {
        category: NoiseCategory::MarketingCopy,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "营销文案：如 \"未配置，26年想省税第一波...\"",
    },
    NoiseRule {
        category: NoiseCategory::NavigationEntry,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "功能入口：持仓透视、我的定投、交易记录、持仓检视",
    },
    NoiseRule {
        category: NoiseCategory::InterpretiveLabel,
        detector: Detector::InstructionOnly,
        context: ContextRequirement::None,
        instruction: "解读（单独一行时）",
    },
];

#[derive(Debug)]
enum Matcher {
    Glyph,
    Regex(Regex),
    Contains(String),
}

#[derive(Debug)]
struct CompiledRule {
    category: NoiseCategory,
    matcher: Matcher,
    context: ContextRequirement,
}

impl CompiledRule {
    fn matches(&self, line: &str, ctx: &LineContext) -> bool {
        if self.context == ContextRequirement::MultiLineChunk && ctx.total_chunk_size <= 1 {
            return false;
        }
        match &self.matcher {
            Matcher::Glyph => {
                let mut chars = line.chars();
                matches!((chars.next(), chars.next()), (Some(c), None) if NOISE_GLYPHS.contains(&c))
            }
            Matcher::Regex(re) => re.is_match(line),
            Matcher::Contains(marker) => line.contains(marker.as_str()),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| CleanError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Anchors a user pattern so it must cover the whole trimmed line
fn compile_whole_line(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| CleanError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// The deterministic part of the noise taxonomy, compiled once
#[derive(Debug)]
pub struct NoiseRuleSet {
    rules: Vec<CompiledRule>,
    extra_patterns: Vec<String>,
}

impl NoiseRuleSet {
    pub fn builtin() -> Result<Self> {
        Self::with_extra_patterns(&[])
    }

    /// Built-in rules followed by user patterns (category `Custom`)
    pub fn with_extra_patterns(patterns: &[String]) -> Result<Self> {
        let mut rules = Vec::new();

        for rule in NOISE_RULES {
            let matcher = match rule.detector {
                Detector::Glyph => Matcher::Glyph,
                Detector::Pattern(pattern) => Matcher::Regex(compile(pattern)?),
                Detector::Contains(marker) => Matcher::Contains(marker.to_string()),
                Detector::InstructionOnly => continue,
            };
            rules.push(CompiledRule {
                category: rule.category,
                matcher,
                context: rule.context,
            });
        }

        for pattern in patterns {
            rules.push(CompiledRule {
                category: NoiseCategory::Custom,
                matcher: Matcher::Regex(compile_whole_line(pattern)?),
                context: ContextRequirement::None,
            });
        }

        Ok(Self {
            rules,
            extra_patterns: patterns.to_vec(),
        })
    }

    /// First matching category for a trimmed line
    pub fn detect(&self, line: &str, ctx: &LineContext) -> Option<NoiseCategory> {
        self.rules
            .iter()
            .find(|rule| rule.matches(line, ctx))
            .map(|rule| rule.category)
    }

    pub fn extra_patterns(&self) -> &[String] {
        &self.extra_patterns
    }

    /// Number of deterministic rules, user patterns included
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect_alone(rules: &NoiseRuleSet, line: &str) -> Option<NoiseCategory> {
        rules.detect(line, &LineContext::standalone())
    }

    #[test]
    fn test_builtin_table_compiles() {
        let rules = NoiseRuleSet::builtin().unwrap();
        // glyph, clock, percent, date, two bank-card rows, numeric fragment
        assert_eq!(rules.rule_count(), 7);
    }

    #[test]
    fn test_deterministic_rows_in_precedence_order() {
        let order: Vec<NoiseCategory> = NOISE_RULES
            .iter()
            .filter(|r| !matches!(r.detector, Detector::InstructionOnly))
            .map(|r| r.category)
            .collect();
        assert_eq!(
            order,
            vec![
                NoiseCategory::IsolatedGlyph,
                NoiseCategory::StatusBarClock,
                NoiseCategory::AxisPercentTick,
                NoiseCategory::AxisDateTick,
                NoiseCategory::BankCardSuffix,
                NoiseCategory::BankCardSuffix,
                NoiseCategory::NumericFragment,
            ]
        );
    }

    #[test]
    fn test_clock_times() {
        let rules = NoiseRuleSet::builtin().unwrap();
        assert_eq!(detect_alone(&rules, "14:07"), Some(NoiseCategory::StatusBarClock));
        assert_eq!(detect_alone(&rules, "9:41"), Some(NoiseCategory::StatusBarClock));
        assert_eq!(detect_alone(&rules, "14:081"), Some(NoiseCategory::StatusBarClock));
        assert_eq!(detect_alone(&rules, "14：07"), Some(NoiseCategory::StatusBarClock));
        assert_eq!(detect_alone(&rules, "14:0812"), None);
    }

    #[test]
    fn test_percentage_tick_needs_multiline_chunk() {
        let rules = NoiseRuleSet::builtin().unwrap();
        assert_eq!(detect_alone(&rules, "9.00%"), None);

        let lines = ["9.00%", "6.00%"];
        let ctx = LineContext::at(&lines, 0);
        assert_eq!(rules.detect("9.00%", &ctx), Some(NoiseCategory::AxisPercentTick));
        assert_eq!(rules.detect("-1.175%", &ctx), Some(NoiseCategory::AxisPercentTick));
        assert_eq!(rules.detect("1.1754%", &ctx), None);
        assert_eq!(rules.detect("本基金 -1.17%", &ctx), None);
    }

    #[test]
    fn test_glyphs_and_fragments() {
        let rules = NoiseRuleSet::builtin().unwrap();
        assert_eq!(detect_alone(&rules, "·"), Some(NoiseCategory::IsolatedGlyph));
        assert_eq!(detect_alone(&rules, "￥"), Some(NoiseCategory::IsolatedGlyph));
        assert_eq!(detect_alone(&rules, "0"), Some(NoiseCategory::IsolatedGlyph));
        assert_eq!(detect_alone(&rules, "94"), Some(NoiseCategory::NumericFragment));
        assert_eq!(detect_alone(&rules, "-2"), Some(NoiseCategory::NumericFragment));
        assert_eq!(detect_alone(&rules, "1234"), None);
        assert_eq!(detect_alone(&rules, "A"), None);
    }

    #[test]
    fn test_dates_and_bank_cards() {
        let rules = NoiseRuleSet::builtin().unwrap();
        assert_eq!(detect_alone(&rules, "25.12.31"), Some(NoiseCategory::AxisDateTick));
        assert_eq!(detect_alone(&rules, "2025.12.31"), None);
        assert_eq!(
            detect_alone(&rules, "招商银行 银行卡尾号8888"),
            Some(NoiseCategory::BankCardSuffix)
        );
        assert_eq!(detect_alone(&rules, "尾号1234"), Some(NoiseCategory::BankCardSuffix));
        assert_eq!(detect_alone(&rules, "尾号12345"), None);
    }

    #[test]
    fn test_extra_patterns_are_custom() {
        let rules = NoiseRuleSet::with_extra_patterns(&["^晒收益$".to_string()]).unwrap();
        assert_eq!(detect_alone(&rules, "晒收益"), Some(NoiseCategory::Custom));
        assert_eq!(rules.extra_patterns(), &["^晒收益$".to_string()]);
    }

    #[test]
    fn test_extra_patterns_match_whole_lines_only() {
        let rules = NoiseRuleSet::with_extra_patterns(&["晒收益".to_string()]).unwrap();
        assert_eq!(rules.rule_count(), 8);
        assert_eq!(detect_alone(&rules, "晒收益"), Some(NoiseCategory::Custom));
        assert_eq!(detect_alone(&rules, "晒收益率 12.35%"), None);
        assert_eq!(detect_alone(&rules, "去晒收益"), None);

        // alternation stays inside the anchors
        let rules = NoiseRuleSet::with_extra_patterns(&["广告|推广".to_string()]).unwrap();
        assert_eq!(detect_alone(&rules, "推广"), Some(NoiseCategory::Custom));
        assert_eq!(detect_alone(&rules, "广告位招租"), None);

        // the raw text is kept for the instruction text
        assert_eq!(rules.extra_patterns(), &["广告|推广".to_string()]);
    }

    #[test]
    fn test_bad_extra_pattern_is_reported() {
        let err = NoiseRuleSet::with_extra_patterns(&["(unclosed".to_string()]).unwrap_err();
        assert!(matches!(err, CleanError::Pattern { ref pattern, .. } if pattern == "(unclosed"));
    }
}
