// ==========================================
// 跨境电商数据中台 - 字段匹配结果
// ==========================================
// 生命周期: 每次调用产生，引擎不持久化
// ==========================================

use crate::domain::field_dictionary::FieldDictionaryEntry;
use crate::domain::types::MatchMethod;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ==========================================
// MatchResult - 单列匹配结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched: bool,
    pub standard_field: Option<String>,
    pub confidence: f64, // 0.0 ~ 1.0
    pub match_method: MatchMethod,
    pub dimensions: BTreeMap<String, String>,
    pub target_table: Option<String>,
    pub target_columns: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>, // 命中的正则（仅模式匹配）
}

impl MatchResult {
    /// 未匹配结果
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            standard_field: None,
            confidence: 0.0,
            match_method: MatchMethod::None,
            dimensions: BTreeMap::new(),
            target_table: None,
            target_columns: Value::Object(Default::default()),
            pattern: None,
        }
    }

    /// 基于字典条目构造命中结果
    pub fn hit(entry: &FieldDictionaryEntry, method: MatchMethod, confidence: f64) -> Self {
        Self {
            matched: true,
            standard_field: Some(entry.field_code.clone()),
            confidence,
            match_method: method,
            dimensions: BTreeMap::new(),
            target_table: entry.target_table.clone(),
            target_columns: match &entry.target_columns {
                Value::Null => Value::Object(Default::default()),
                v => v.clone(),
            },
            pattern: None,
        }
    }
}

// ==========================================
// MatchSummary - 批量匹配统计
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub total: usize,
    pub matched: usize,
}

impl MatchSummary {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a MatchResult>,
    {
        let mut summary = Self {
            total: 0,
            matched: 0,
        };
        for r in results {
            summary.total += 1;
            if r.matched {
                summary.matched += 1;
            }
        }
        summary
    }

    /// 成功率（百分比，空输入为 0）
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64 * 100.0
        }
    }
}
