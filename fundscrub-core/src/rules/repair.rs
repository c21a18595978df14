use crate::error::{CleanError, Result};
use crate::types::RepairKind;
use regex::{Captures, Regex};

/// Allowed in-line repairs, as described to the rewriting service
pub const REPAIR_RULES: &[(RepairKind, &str)] = &[
    (
        RepairKind::TrailingZero,
        "\"金额（元）0\" → \"金额（元）\"、\"您已持有49天0\" → \"您已持有49天\"、\"指数型-股票被动均值0\" → \"指数型-股票被动均值\"（去掉尾部多余的 0）",
    ),
    (
        RepairKind::TrailingDecoration,
        "\"业绩比较基准▼\" → \"业绩比较基准\"、\"195,921.06 >\" → \"195,921.06\"（去掉行尾的 ▼ 或 >）",
    ),
    (
        RepairKind::LeadingBullet,
        "\"· 股票型均值\" → \"股票型均值\"（去掉前导 · 或 ●）",
    ),
    (
        RepairKind::FullWidthComma,
        "\"52，696.57\" → \"52,696.57\"（任何金额中的中文逗号都改为英文逗号）",
    ),
    (
        RepairKind::MalformedSeparators,
        "\"279.411.6\" → \"279,411.60\"（错误的点号分隔符改为逗号，补齐两位小数）",
    ),
    (
        RepairKind::DecimalPadding,
        "小数点后只有一位的金额补齐为两位（如 .6 → .60）",
    ),
];

const LEADING_BULLETS: &[char] = &['·', '●'];

const TRAILING_DECORATIONS: &[char] = &['>', '＞', '›', '〉', '»', '▼', '▲', '▶', '►', '◀', '◄'];

/// A repaired line and the repairs that fired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub text: String,
    pub applied: Vec<RepairKind>,
}

/// Applies the repair rules in a fixed order. Every rule only touches
/// separators, padding or decoration.
#[derive(Debug)]
pub struct Repairer {
    chart_label: Regex,
    complete_amount_zero: Regex,
    malformed_amount: Regex,
    short_fraction: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| CleanError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl Repairer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            chart_label: compile(
                r"^(?:业绩走势\s*[：:]?\s*)?收益明细\s*[：:]?\s*(实时估值\s*[+\-]?\d+(?:\.\d+)?%)$",
            )?,
            complete_amount_zero: compile(r"(?:^|[^\d.,])\d{1,3}(?:,\d{3})+\.\d{2}0$")?,
            malformed_amount: compile(r"(\d{1,3}(?:\.\d{3})+)\.(\d)")?,
            short_fraction: compile(r"\d{1,3}(?:,\d{3})+\.\d")?,
        })
    }

    pub fn repair(&self, line: &str) -> Repaired {
        let mut text = line.to_string();
        let mut applied = Vec::new();

        let steps: [(RepairKind, &dyn Fn(&str) -> Option<String>); 7] = [
            (RepairKind::LeadingBullet, &strip_leading_bullet),
            (RepairKind::ChartLabelPrefix, &|s: &str| self.strip_chart_label(s)),
            (RepairKind::TrailingDecoration, &strip_trailing_decoration),
            (RepairKind::TrailingZero, &|s: &str| self.strip_trailing_zero(s)),
            (RepairKind::FullWidthComma, &normalize_fullwidth_commas),
            (RepairKind::MalformedSeparators, &|s: &str| self.fix_malformed_separators(s)),
            (RepairKind::DecimalPadding, &|s: &str| self.pad_short_fraction(s)),
        ];

        for (kind, step) in steps.iter() {
            if let Some(next) = step(&text) {
                if next != text {
                    text = next;
                    applied.push(*kind);
                }
            }
        }

        Repaired { text, applied }
    }

    fn strip_chart_label(&self, line: &str) -> Option<String> {
        self.chart_label
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn strip_trailing_zero(&self, line: &str) -> Option<String> {
        let body = line.strip_suffix('0')?;
        let prev = body.chars().last()?;
        let after_word = prev.is_alphabetic() || matches!(prev, '）' | ')' | '】' | ']');
        if after_word || self.complete_amount_zero.is_match(line) {
            Some(body.to_string())
        } else {
            None
        }
    }

    fn fix_malformed_separators(&self, line: &str) -> Option<String> {
        replace_standalone(&self.malformed_amount, line, |caps| {
            format!("{}.{}0", caps[1].replace('.', ","), &caps[2])
        })
    }

    fn pad_short_fraction(&self, line: &str) -> Option<String> {
        replace_standalone(&self.short_fraction, line, |caps| format!("{}0", &caps[0]))
    }
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | ',')
}

/// Rewrites every match of `re` that is a whole number on its own, i.e. not
/// touching another digit or separator on either side. Separators between two
/// amounts stay untouched, so each amount on the line is checked separately.
fn replace_standalone(
    re: &Regex,
    line: &str,
    rewrite: impl Fn(&Captures) -> String,
) -> Option<String> {
    let mut out = String::with_capacity(line.len() + 4);
    let mut last = 0;

    for caps in re.captures_iter(line) {
        let Some(m) = caps.get(0) else { continue };
        let before = line[..m.start()].chars().next_back();
        let after = line[m.end()..].chars().next();
        if before.is_some_and(is_number_char) || after.is_some_and(is_number_char) {
            continue;
        }
        out.push_str(&line[last..m.start()]);
        out.push_str(&rewrite(&caps));
        last = m.end();
    }

    if last == 0 {
        return None;
    }
    out.push_str(&line[last..]);
    Some(out)
}

fn strip_leading_bullet(line: &str) -> Option<String> {
    let rest = line.strip_prefix(LEADING_BULLETS)?.trim_start();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn strip_trailing_decoration(line: &str) -> Option<String> {
    let rest = line.strip_suffix(TRAILING_DECORATIONS)?.trim_end();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn normalize_fullwidth_commas(line: &str) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut changed = false;
    let mut out = String::with_capacity(line.len());

    for (i, &c) in chars.iter().enumerate() {
        let between_digits = c == '，'
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
        if between_digits {
            out.push(',');
            changed = true;
        } else {
            out.push(c);
        }
    }

    changed.then_some(out)
}

/// Magnitude key of each numeric token: integer digits without grouping
/// separators, then the fraction digits with trailing zeros trimmed. The last
/// '.' in a token is taken as the decimal point. Tokens that are only zeros
/// are skipped.
fn digit_keys(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            current.push(c);
            continue;
        }
        // separator inside a number keeps the token open
        let is_separator = matches!(c, '.' | ',' | '，')
            && !current.is_empty()
            && chars.peek().is_some_and(|n| n.is_ascii_digit());
        if is_separator {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .iter()
        .filter_map(|token| {
            let (int_part, frac_part) = match token.rfind('.') {
                Some(pos) => (&token[..pos], &token[pos + 1..]),
                None => (token.as_str(), ""),
            };
            let int_digits: String = int_part.chars().filter(|c| c.is_ascii_digit()).collect();
            let frac_digits = frac_part.trim_end_matches('0');
            if int_digits.trim_start_matches('0').is_empty() && frac_digits.is_empty() {
                None
            } else {
                Some(format!("{int_digits}.{frac_digits}"))
            }
        })
        .collect()
}

/// True when every numeric token in `after` has the same magnitude digits, in
/// the same order, as in `before`. Only grouping separators, fraction padding
/// and stray zero tokens may differ.
pub fn digits_preserved(before: &str, after: &str) -> bool {
    digit_keys(before) == digit_keys(after)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repair(line: &str) -> Repaired {
        Repairer::new().unwrap().repair(line)
    }

    #[test]
    fn test_malformed_amount_is_regrouped_and_padded() {
        let r = repair("279.411.6");
        assert_eq!(r.text, "279,411.60");
        assert_eq!(r.applied, vec![RepairKind::MalformedSeparators]);

        assert_eq!(repair("市值1.234.567.8元").text, "市值1,234,567.80元");
    }

    #[test]
    fn test_every_amount_on_a_line_is_repaired() {
        let r = repair("279.411.6 1.234.5");
        assert_eq!(r.text, "279,411.60 1,234.50");
        assert_eq!(r.applied, vec![RepairKind::MalformedSeparators]);

        assert_eq!(repair("1,234.5 5,678.9").text, "1,234.50 5,678.90");
        assert_eq!(repair("12,345.6/7,890.1").text, "12,345.60/7,890.10");

        // a longer fraction is not a one-digit amount
        assert!(repair("279.411.65").applied.is_empty());
        assert!(repair("1,234.56 5,678.90").applied.is_empty());
    }

    #[test]
    fn test_dates_are_not_amounts() {
        assert!(repair("25.12.31").applied.is_empty());
        assert!(repair("2026.02.03").applied.is_empty());
    }

    #[test]
    fn test_fullwidth_comma() {
        let r = repair("52，696.57");
        assert_eq!(r.text, "52,696.57");
        assert_eq!(r.applied, vec![RepairKind::FullWidthComma]);

        // prose commas stay
        assert!(repair("未配置，26年想省税").applied.is_empty());
    }

    #[test]
    fn test_fullwidth_comma_then_padding() {
        let r = repair("1，234，567.5");
        assert_eq!(r.text, "1,234,567.50");
        assert_eq!(
            r.applied,
            vec![RepairKind::FullWidthComma, RepairKind::DecimalPadding]
        );
    }

    #[test]
    fn test_trailing_zero_after_word() {
        assert_eq!(repair("金额（元）0").text, "金额（元）");
        assert_eq!(repair("您已持有49天0").text, "您已持有49天");
        assert_eq!(repair("指数型-股票被动均值0").text, "指数型-股票被动均值");
    }

    #[test]
    fn test_trailing_zero_kept_in_numbers() {
        assert!(repair("昨日收益 10").applied.is_empty());
        assert!(repair("1.2340").applied.is_empty());
        assert!(repair("定投10.00元").applied.is_empty());
        assert!(repair("涨幅-0").applied.is_empty());
    }

    #[test]
    fn test_trailing_zero_after_complete_amount() {
        assert_eq!(repair("195,921.060").text, "195,921.06");
        // ungrouped values could be four-decimal net values
        assert!(repair("12.340").applied.is_empty());
    }

    #[test]
    fn test_decoration_and_bullets() {
        assert_eq!(repair("业绩比较基准▼").text, "业绩比较基准");
        assert_eq!(repair("195,921.06 >").text, "195,921.06");
        assert_eq!(repair("· 股票型均值").text, "股票型均值");
        assert_eq!(repair("●沪深300").text, "沪深300");
        assert!(repair("●").applied.is_empty());
    }

    #[test]
    fn test_chart_label_reduced_to_valuation() {
        let r = repair("业绩走势：收益明细 实时估值+1.49%");
        assert_eq!(r.text, "实时估值+1.49%");
        assert_eq!(r.applied, vec![RepairKind::ChartLabelPrefix]);
        assert_eq!(repair("收益明细 实时估值-0.32%").text, "实时估值-0.32%");
        assert!(repair("实时估值+1.49%").applied.is_empty());
    }

    #[test]
    fn test_repairs_preserve_digits() {
        let corpus = [
            "279.411.6",
            "市值1.234.567.8元",
            "52，696.57",
            "1，234，567.5",
            "金额（元）0",
            "您已持有49天0",
            "195,921.06 >",
            "195,921.060",
            "业绩走势：收益明细 实时估值+1.49%",
            "· 股票型均值",
            "持仓收益率 +12.35%",
            "易方达蓝筹精选混合 005827",
            "279,411.6",
            "279.411.6 1.234.5",
            "1,234.5 5,678.9",
        ];
        let repairer = Repairer::new().unwrap();
        for line in corpus {
            let repaired = repairer.repair(line);
            assert!(
                digits_preserved(line, &repaired.text),
                "digits changed: {line:?} -> {:?}",
                repaired.text
            );
        }
    }

    #[test]
    fn test_verifier_rejects_changed_digits() {
        assert!(!digits_preserved("279,411.60", "279,411.61"));
        assert!(!digits_preserved("1.49%", "14.9%"));
        assert!(!digits_preserved("005827", "005872"));
        assert!(!digits_preserved("12.35", "12.3"));
        assert!(!digits_preserved("100", "1"));
        assert!(digits_preserved("279.411.6", "279,411.60"));
    }
}
