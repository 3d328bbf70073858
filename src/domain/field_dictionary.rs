// ==========================================
// 跨境电商数据中台 - 字段字典领域模型
// ==========================================
// 对齐: field_mapping_dictionary 表
// 生命周期: 由外部管理工具维护，引擎只读
// ==========================================

use crate::domain::types::DimensionRule;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ==========================================
// FieldDictionaryEntry - 标准字段定义
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDictionaryEntry {
    // ===== 主键 =====
    pub field_code: String, // 标准字段代码（唯一）

    // ===== 名称 =====
    pub cn_name: String,                 // 中文名
    pub en_name: Option<String>,         // 英文名
    pub description: Option<String>,     // 描述

    // ===== 分类 =====
    pub data_domain: String,         // 数据域 (orders/products/traffic)
    pub field_group: Option<String>, // 字段分组
    pub is_required: bool,           // 是否必填
    pub data_type: String,           // 数据类型 (string/decimal/date...)

    // ===== 匹配规则 =====
    pub synonyms: Vec<String>, // 同义词（按顺序参与精确匹配）
    pub match_weight: f64,     // 匹配权重（域内降序）
    pub active: bool,          // 是否启用

    // ===== 模式匹配 =====
    pub is_pattern_based: bool,                             // 是否基于正则
    pub field_pattern: Option<String>,                      // 含命名捕获组的正则
    pub dimension_config: BTreeMap<String, DimensionRule>,  // 维度名 -> 规则

    // ===== 下游落库 =====
    pub target_table: Option<String>,
    pub target_columns: Value,
}

impl FieldDictionaryEntry {
    /// 创建一个启用状态的基础字段定义
    pub fn new(field_code: &str, cn_name: &str, data_domain: &str) -> Self {
        Self {
            field_code: field_code.to_string(),
            cn_name: cn_name.to_string(),
            data_domain: data_domain.to_string(),
            data_type: "string".to_string(),
            match_weight: 1.0,
            active: true,
            target_columns: Value::Object(Default::default()),
            ..Default::default()
        }
    }

    /// 是否具备可用的模式规则
    pub fn has_pattern(&self) -> bool {
        self.is_pattern_based
            && self
                .field_pattern
                .as_deref()
                .map(|p| !p.trim().is_empty())
                .unwrap_or(false)
    }
}
