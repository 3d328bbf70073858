// ==========================================
// 跨境电商数据中台 - 货币标准化
// ==========================================
// 职责: ISO 代码 / 货币符号 / 本地化名称 -> ISO 代码
// 红线: 永不失败，无法识别时原样透传并告警
// ==========================================

/// 默认本位币
pub const DEFAULT_BASE_CURRENCY: &str = "CNY";

/// 已知 ISO 4217 代码
const KNOWN_CODES: &[&str] = &[
    "CNY", "USD", "EUR", "GBP", "JPY", "HKD", "TWD", "KRW", "SGD", "MYR", "THB", "VND", "PHP",
    "IDR", "INR", "BRL", "MXN", "CLP", "COP", "PEN", "ARS", "AUD", "NZD", "CAD", "CHF", "RUB",
    "TRY", "PLN", "SEK", "NOK", "DKK", "AED", "SAR", "ZAR",
];

/// 货币符号表（原文精确匹配，歧义符号取常见地区币种）
const SYMBOL_TO_CODE: &[(&str, &str)] = &[
    ("¥", "CNY"),
    ("￥", "CNY"),
    ("RMB", "CNY"),
    ("$", "USD"),
    ("US$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("HK$", "HKD"),
    ("NT$", "TWD"),
    ("₩", "KRW"),
    ("S$", "SGD"),
    ("RM", "MYR"),
    ("฿", "THB"),
    ("₫", "VND"),
    ("₱", "PHP"),
    ("Rp", "IDR"),
    ("₹", "INR"),
    ("R$", "BRL"),
    ("MX$", "MXN"),
    ("A$", "AUD"),
    ("C$", "CAD"),
    ("₽", "RUB"),
];

/// 本地化名称表（中文原文匹配，英文不区分大小写）
const NAME_TO_CODE: &[(&str, &str)] = &[
    ("人民币", "CNY"),
    ("元", "CNY"),
    ("美元", "USD"),
    ("美金", "USD"),
    ("欧元", "EUR"),
    ("英镑", "GBP"),
    ("日元", "JPY"),
    ("港币", "HKD"),
    ("港元", "HKD"),
    ("新台币", "TWD"),
    ("韩元", "KRW"),
    ("新加坡元", "SGD"),
    ("新币", "SGD"),
    ("马来西亚林吉特", "MYR"),
    ("林吉特", "MYR"),
    ("马币", "MYR"),
    ("泰铢", "THB"),
    ("越南盾", "VND"),
    ("菲律宾比索", "PHP"),
    ("印尼盾", "IDR"),
    ("印度尼西亚盾", "IDR"),
    ("印度卢比", "INR"),
    ("巴西雷亚尔", "BRL"),
    ("雷亚尔", "BRL"),
    ("墨西哥比索", "MXN"),
    ("澳元", "AUD"),
    ("加元", "CAD"),
    ("卢布", "RUB"),
    ("chinese yuan", "CNY"),
    ("renminbi", "CNY"),
    ("us dollar", "USD"),
    ("euro", "EUR"),
    ("singapore dollar", "SGD"),
    ("malaysian ringgit", "MYR"),
    ("thai baht", "THB"),
    ("brazilian real", "BRL"),
];

// ==========================================
// CurrencyNormalizer - 货币标准化器
// ==========================================
#[derive(Debug, Clone)]
pub struct CurrencyNormalizer {
    base_currency: String,
}

impl Default for CurrencyNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_CURRENCY)
    }
}

impl CurrencyNormalizer {
    /// 创建标准化器
    ///
    /// # 参数
    /// - base_currency: 空输入时返回的本位币
    pub fn new(base_currency: &str) -> Self {
        Self {
            base_currency: base_currency.trim().to_uppercase(),
        }
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// 标准化货币文本
    ///
    /// 顺序: 空值 -> 3 位大写代码 -> 符号表 -> 名称表 -> 去空白大写 -> 原样透传
    pub fn normalize(&self, input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            tracing::warn!(base_currency = %self.base_currency, "货币为空，使用本位币");
            return self.base_currency.clone();
        }

        if is_iso_shaped(trimmed) {
            if is_known_code(trimmed) {
                return trimmed.to_string();
            }
            // 3 位大写别名（如 RMB）
            if let Some(code) = lookup_symbol(trimmed) {
                return code.to_string();
            }
            tracing::warn!(currency = %trimmed, "未登记的货币代码，原样透传");
            return trimmed.to_string();
        }

        if let Some(code) = lookup_symbol(trimmed) {
            return code.to_string();
        }

        if let Some(code) = lookup_name(trimmed) {
            return code.to_string();
        }

        let compact: String = trimmed
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        if is_known_code(&compact) {
            return compact;
        }
        if let Some(code) = lookup_symbol(&compact) {
            return code.to_string();
        }

        tracing::warn!(currency = %trimmed, "无法识别的货币，原样透传");
        trimmed.to_string()
    }
}

/// 是否为已登记的 ISO 代码
pub fn is_known_code(code: &str) -> bool {
    KNOWN_CODES.contains(&code)
}

/// 符号表（供货币提取器使用）
pub fn symbol_table() -> &'static [(&'static str, &'static str)] {
    SYMBOL_TO_CODE
}

/// 名称表（供货币提取器使用）
pub fn name_table() -> &'static [(&'static str, &'static str)] {
    NAME_TO_CODE
}

fn is_iso_shaped(s: &str) -> bool {
    s.len() == 3 && s.bytes().all(|b| b.is_ascii_uppercase())
}

fn lookup_symbol(s: &str) -> Option<&'static str> {
    SYMBOL_TO_CODE
        .iter()
        .find(|(symbol, _)| *symbol == s)
        .map(|(_, code)| *code)
}

fn lookup_name(s: &str) -> Option<&'static str> {
    let lowered = s.to_lowercase();
    NAME_TO_CODE
        .iter()
        .find(|(name, _)| *name == s || *name == lowered)
        .map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_codes_pass_through() {
        let n = CurrencyNormalizer::default();
        assert_eq!(n.normalize("SGD"), "SGD");
        assert_eq!(n.normalize("  BRL "), "BRL");
        // 未登记但格式正确的代码保留
        assert_eq!(n.normalize("XYZ"), "XYZ");
    }

    #[test]
    fn test_symbols_and_names() {
        let n = CurrencyNormalizer::default();
        assert_eq!(n.normalize("S$"), "SGD");
        assert_eq!(n.normalize("R$"), "BRL");
        assert_eq!(n.normalize("¥"), "CNY");
        assert_eq!(n.normalize("$"), "USD");
        assert_eq!(n.normalize("RMB"), "CNY");
        assert_eq!(n.normalize("人民币"), "CNY");
        assert_eq!(n.normalize("欧元"), "EUR");
        assert_eq!(n.normalize("Singapore Dollar"), "SGD");
    }

    #[test]
    fn test_compact_uppercase_fallback() {
        let n = CurrencyNormalizer::default();
        assert_eq!(n.normalize("usd"), "USD");
        assert_eq!(n.normalize("u s d"), "USD");
        assert_eq!(n.normalize("Myr"), "MYR");
    }

    #[test]
    fn test_empty_uses_base_currency() {
        assert_eq!(CurrencyNormalizer::default().normalize("   "), "CNY");
        assert_eq!(CurrencyNormalizer::new("usd").normalize(""), "USD");
    }

    #[test]
    fn test_unknown_passes_through() {
        let n = CurrencyNormalizer::default();
        assert_eq!(n.normalize("金币"), "金币");
        assert_eq!(n.normalize("dogecoin"), "dogecoin");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let n = CurrencyNormalizer::default();
        let inputs = [
            "", " ", "SGD", "S$", "人民币", "rmb", "RMB", "usd", "XYZ", "xyz", "金币", " R$ ",
            "u s d", "Rp", "元", "€", "abc def", "US$", "泰铢",
        ];
        for x in inputs {
            let once = n.normalize(x);
            assert_eq!(n.normalize(&once), once, "输入 {:?}", x);
        }
    }
}
