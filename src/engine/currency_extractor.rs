// ==========================================
// 跨境电商数据中台 - 表头货币提取
// ==========================================
// 职责: 从表头文本中识别货币，并去除货币部分得到归一化字段名
// 识别顺序: ISO 代码 (位置最靠前者) -> 货币符号 (长者优先) -> 本地化名称 (长者优先)
// ==========================================

use crate::engine::currency_normalizer::{is_known_code, name_table, symbol_table};
use regex::{Captures, Regex};

/// ISO 代码出现形式: (BRL) / _BRL / -BRL / 空格 BRL，末尾或中间
const ISO_PATTERNS: &[&str] = &[
    r"[(（]\s*([A-Za-z]{3})\s*[)）]",
    r"_([A-Za-z]{3})(?:_|$)",
    r"-([A-Za-z]{3})(?:-|$)",
    r"\s([A-Za-z]{3})(?:\s|$)",
];

// ==========================================
// CurrencyExtractor - 表头货币提取器
// ==========================================
#[derive(Debug, Clone)]
pub struct CurrencyExtractor {
    iso_patterns: Vec<Regex>,
    bracketed_code: Regex,
    separated_code: Regex,
    trailing_code: Regex,
    edge_separators: Regex,
    symbols: Vec<(&'static str, &'static str)>,
    names: Vec<(&'static str, &'static str)>,
}

impl CurrencyExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        let iso_patterns = ISO_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut symbols: Vec<_> = symbol_table().to_vec();
        symbols.sort_by_key(|(s, _)| std::cmp::Reverse(s.chars().count()));
        let mut names: Vec<_> = name_table().to_vec();
        names.sort_by_key(|(s, _)| std::cmp::Reverse(s.chars().count()));

        Ok(Self {
            iso_patterns,
            bracketed_code: Regex::new(r"\s*[(（]\s*([A-Za-z]{3})\s*[)）]")?,
            separated_code: Regex::new(r"([_\-\s])([A-Za-z]{3})([_\-\s])")?,
            trailing_code: Regex::new(r"[_\-\s]([A-Za-z]{3})$")?,
            edge_separators: Regex::new(r"^[_\s\-(、，,]+|[_\s\-()、，,]+$")?,
            symbols,
            names,
        })
    }

    /// 从表头中提取货币代码
    ///
    /// # 返回
    /// - Some(code): 识别到的 ISO 代码
    /// - None: 表头不含可识别的货币
    pub fn extract_currency_code(&self, header: &str) -> Option<String> {
        if header.trim().is_empty() {
            return None;
        }

        // 1. ISO 代码，取位置最靠前的有效代码
        let mut earliest: Option<(usize, String)> = None;
        for pattern in &self.iso_patterns {
            for caps in pattern.captures_iter(header) {
                let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let code = code.as_str().to_uppercase();
                if !is_known_code(&code) {
                    continue;
                }
                if earliest.as_ref().map_or(true, |(pos, _)| whole.start() < *pos) {
                    earliest = Some((whole.start(), code));
                }
            }
        }
        if let Some((pos, code)) = earliest {
            tracing::debug!(header = %header, position = pos, currency = %code, "表头 ISO 代码识别");
            return Some(code);
        }

        // 2. 货币符号
        for (symbol, code) in &self.symbols {
            if symbol_appears(header, symbol) {
                tracing::debug!(header = %header, symbol = %symbol, currency = %code, "表头货币符号识别");
                return Some(code.to_string());
            }
        }

        // 3. 本地化名称
        let lowered = header.to_lowercase();
        for (name, code) in &self.names {
            if lowered.contains(name) {
                tracing::debug!(header = %header, name = %name, currency = %code, "表头货币名称识别");
                return Some(code.to_string());
            }
        }

        None
    }

    /// 归一化字段名（去除货币部分与首尾分隔符）
    pub fn normalize_field_name(&self, header: &str) -> String {
        let mut normalized = header.trim().to_string();

        // 1. ISO 代码
        normalized = self
            .bracketed_code
            .replace_all(&normalized, |caps: &Captures| keep_unless_known(caps, ""))
            .into_owned();
        normalized = self
            .separated_code
            .replace_all(&normalized, |caps: &Captures| {
                if is_known_code(&caps[2].to_uppercase()) {
                    caps[1].to_string()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
        normalized = self
            .trailing_code
            .replace_all(&normalized, |caps: &Captures| keep_unless_known(caps, ""))
            .into_owned();

        // 2. 货币符号与名称（括号内或末尾）
        for (token, _) in self.symbols.iter().chain(self.names.iter()) {
            for wrapped in [format!("({})", token), format!("（{}）", token)] {
                normalized = normalized.replace(&wrapped, "");
            }
            if let Some(stripped) = normalized.strip_suffix(token) {
                if !token.chars().all(|c| c.is_ascii_alphabetic())
                    || !stripped.chars().last().map_or(false, |c| c.is_ascii_alphabetic())
                {
                    normalized = stripped.to_string();
                }
            }
        }

        // 3. 首尾分隔符
        let cleaned = self.edge_separators.replace_all(normalized.trim(), "");
        balance_brackets(cleaned.trim())
    }

    /// 提取货币并归一化字段名
    pub fn extract_and_normalize(&self, header: &str) -> (Option<String>, String) {
        (
            self.extract_currency_code(header),
            self.normalize_field_name(header),
        )
    }
}

fn keep_unless_known(caps: &Captures, replacement: &str) -> String {
    if is_known_code(&caps[1].to_uppercase()) {
        replacement.to_string()
    } else {
        caps[0].to_string()
    }
}

/// 字母型符号（RM/Rp/RMB）需在括号内或末尾且前一字符非字母，其余符号任意位置
fn symbol_appears(header: &str, symbol: &str) -> bool {
    if !symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        return header.contains(symbol);
    }
    for open in ['(', '（'] {
        for close in [')', '）'] {
            if header.contains(&format!("{}{}{}", open, symbol, close)) {
                return true;
            }
        }
    }
    match header.strip_suffix(symbol) {
        Some(rest) => !rest.chars().last().map_or(false, |c| c.is_ascii_alphabetic()),
        None => false,
    }
}

/// 去除货币后补齐被截断的右括号
fn balance_brackets(s: &str) -> String {
    let mut out = s.to_string();
    if out.matches('（').count() > out.matches('）').count() {
        out.push('）');
    }
    if out.matches('(').count() > out.matches(')').count() {
        out.push(')');
    }
    out
}
