//! Instruction contract for the rewriting service.
//!
//! The noise section is rendered from the same rule table the classifier is
//! built from, so the generative and deterministic passes cannot drift apart.

use crate::rules::{Detector, NoiseRuleSet, NOISE_GLYPHS, NOISE_RULES, REPAIR_RULES};
use sha2::{Digest, Sha256};
use std::fmt::Write;

const INTRO: &str = "\
你是一个 OCR 结果噪声清理工具。下面是从手机基金 APP 截图中 OCR 提取的原始文本，里面混杂了噪声。

你的任务是去除噪声行，保留有效数据行。
";

const HARD_CONSTRAINTS: &[&str] = &[
    "只能删除行，或者对行做极小的修正（见下）。绝对不能新增任何内容。",
    "任何数字、金额、百分比，必须从原文原样保留，禁止修改、推算、或\"修正\"数值。",
    "输出纯文本，不加任何 markdown 格式（不加 ** 标题、不加 * 列表、不加 --- 分隔线）。",
    "保持原文行的顺序。",
];

const PRESERVE_LIST: &[&str] = &[
    "基金名称、基金代码（6位数字）",
    "金额、净值、成本价、份额等数值",
    "昨日收益、持仓收益、持仓收益率",
    "在途资金、可用份额、日涨幅、最新净值、持仓成本价",
    "实时估值（如 实时估值+1.49%）",
    "业绩指标值（紧跟指标名后面的百分比，如 \"本基金\" 后面的 -1.17%）",
    "N个进行中定投计划、N笔交易进行中",
    "定投金额（如 定投10.00元）",
    "该基金暂不能申购",
    "总金额等账户信息",
];

const RAW_TEXT_HEADING: &str = "以下是需要清理的原始文本：";

/// Rendered instruction template plus its digest
#[derive(Debug, Clone)]
pub struct InstructionSet {
    preamble: String,
    digest: String,
}

impl InstructionSet {
    pub fn from_rules(rules: &NoiseRuleSet) -> Self {
        let preamble = render_preamble(rules.extra_patterns());
        let digest = format!("{:x}", Sha256::digest(preamble.as_bytes()));
        Self { preamble, digest }
    }

    /// Everything sent before the raw chunk text
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// SHA-256 of the preamble, hex encoded
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// The single user message for one chunk
    pub fn render(&self, raw_text: &str) -> String {
        let mut prompt = String::with_capacity(self.preamble.len() + raw_text.len() + 1);
        prompt.push_str(&self.preamble);
        prompt.push_str(raw_text);
        prompt.push('\n');
        prompt
    }
}

fn render_preamble(extra_patterns: &[String]) -> String {
    let mut out = String::new();
    out.push_str(INTRO);

    // writeln! into a String cannot fail
    out.push_str("\n严格规则：\n");
    for (i, rule) in HARD_CONSTRAINTS.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, rule);
    }

    out.push_str("\n需要删除的噪声：\n");
    for rule in NOISE_RULES {
        if rule.instruction.is_empty() {
            continue;
        }
        match rule.detector {
            Detector::Glyph => {
                let glyphs: Vec<String> = NOISE_GLYPHS.iter().map(|c| c.to_string()).collect();
                let _ = writeln!(out, "- {}{}", rule.instruction, glyphs.join(" "));
            }
            _ => {
                let _ = writeln!(out, "- {}", rule.instruction);
            }
        }
    }
    for pattern in extra_patterns {
        let _ = writeln!(out, "- 整行匹配正则 {pattern} 的行");
    }

    out.push_str("\n需要保留的数据（注意不要误删）：\n");
    for item in PRESERVE_LIST {
        let _ = writeln!(out, "- {item}");
    }

    out.push_str("\n允许做的行内小修正：\n");
    for (_, description) in REPAIR_RULES {
        let _ = writeln!(out, "- {description}");
    }

    out.push('\n');
    out.push_str(RAW_TEXT_HEADING);
    out.push_str("\n\n");
    out
}
