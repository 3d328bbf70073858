// ==========================================
// 跨境电商数据中台 - 领域类型定义
// ==========================================
// 职责: 匹配方式、维度规则、汇率来源等枚举
// 序列化格式: snake_case (与字典表/下游一致)
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// 匹配方式 (Match Method)
// ==========================================
// 优先级: 精确 > 模式 > 模糊
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    ExactCnName,  // 中文名精确匹配
    ExactSynonym, // 同义词精确匹配
    ExactEnName,  // 英文名精确匹配
    Pattern,      // 正则模式匹配
    Fuzzy,        // 字符集相似度匹配
    None,         // 未匹配
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::ExactCnName => "exact_cn_name",
            MatchMethod::ExactSynonym => "exact_synonym",
            MatchMethod::ExactEnName => "exact_en_name",
            MatchMethod::Pattern => "pattern",
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::None => "none",
        }
    }

    /// 是否为精确匹配（任一精确策略）
    pub fn is_exact(&self) -> bool {
        matches!(
            self,
            MatchMethod::ExactCnName | MatchMethod::ExactSynonym | MatchMethod::ExactEnName
        )
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 维度规则 (Dimension Rule)
// ==========================================
// 存储格式 (dimension_config JSON):
// - {"type": "normalize"}                      -> Normalize
// - {"type": "enum", "mapping": {"原值": "值"}} -> Enum
// - {"type": "extract"}                        -> Extract
// - {"原值": "值"} (旧格式, 无 type)            -> Enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionRule {
    Normalize,                                // 货币标准化
    Enum { mapping: BTreeMap<String, String> }, // 枚举映射，未命中保留原值
    Extract,                                  // 原值透传
}

impl DimensionRule {
    /// 从 JSON 配置解析维度规则
    ///
    /// 无法识别的配置按 Extract 处理（原值透传）
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => match s.as_str() {
                "normalize" => DimensionRule::Normalize,
                _ => DimensionRule::Extract,
            },
            Value::Object(obj) => match obj.get("type").and_then(Value::as_str) {
                Some("normalize") => DimensionRule::Normalize,
                Some("extract") => DimensionRule::Extract,
                Some("enum") => DimensionRule::Enum {
                    mapping: obj
                        .get("mapping")
                        .map(string_mapping)
                        .unwrap_or_default(),
                },
                Some(_) => DimensionRule::Extract,
                None => DimensionRule::Enum {
                    mapping: string_mapping(value),
                },
            },
            _ => DimensionRule::Extract,
        }
    }

    /// 转换为 JSON 存储格式（统一为带 type 的新格式）
    pub fn to_json(&self) -> Value {
        match self {
            DimensionRule::Normalize => serde_json::json!({ "type": "normalize" }),
            DimensionRule::Extract => serde_json::json!({ "type": "extract" }),
            DimensionRule::Enum { mapping } => {
                serde_json::json!({ "type": "enum", "mapping": mapping })
            }
        }
    }
}

fn string_mapping(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

impl Serialize for DimensionRule {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DimensionRule {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(DimensionRule::from_json(&value))
    }
}

// ==========================================
// 汇率来源 (Rate Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Api,    // 汇率提供方实时获取（写穿缓存）
    Manual, // 外部录入/种子数据
}

impl RateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateSource::Api => "api",
            RateSource::Manual => "manual",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "api" => RateSource::Api,
            _ => RateSource::Manual,
        }
    }
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
