// ==========================================
// 跨境电商数据中台 - 字段模式匹配器
// ==========================================
// 职责: 原始表头 -> 标准字段 + 维度
// 策略（首个成功者胜出）:
//   1. 精确匹配 cn_name / synonyms / en_name，置信度 1.0
//   2. 正则模式匹配，提取命名捕获组为维度，置信度 0.95
//   3. 字符集 Jaccard 模糊匹配，阈值 > 0.7，置信度 = 相似度
//   4. 未匹配 (match_method = none)
// 红线: 匹配为纯计算，除字典懒加载外无副作用
// ==========================================

use crate::config::engine_config_trait::EngineConfigReader;
use crate::domain::match_result::{MatchResult, MatchSummary};
use crate::domain::types::{DimensionRule, MatchMethod};
use crate::engine::currency_normalizer::CurrencyNormalizer;
use crate::engine::dictionary_cache::{match_key, CompiledEntry, DictionaryCache, DictionarySnapshot};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// 模式匹配置信度（低于精确匹配）
pub const PATTERN_CONFIDENCE: f64 = 0.95;

/// 模糊匹配默认阈值（不含等于）
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;

// ==========================================
// PatternMatcher
// ==========================================
pub struct PatternMatcher {
    cache: Arc<DictionaryCache>,
    normalizer: CurrencyNormalizer,
    fuzzy_threshold: f64,
}

impl PatternMatcher {
    pub fn new(cache: Arc<DictionaryCache>, normalizer: CurrencyNormalizer) -> Self {
        Self {
            cache,
            normalizer,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }

    /// 设置模糊匹配阈值（严格大于该值才算命中）
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// 按 config_kv 配置构造（本位币 + 模糊阈值）
    pub async fn from_engine_config(
        cache: Arc<DictionaryCache>,
        reader: &dyn EngineConfigReader,
    ) -> EngineResult<Self> {
        let base = reader
            .get_base_currency()
            .await
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let threshold = reader
            .get_fuzzy_threshold()
            .await
            .map_err(|e| EngineError::Config(e.to_string()))?;
        Ok(Self::new(cache, CurrencyNormalizer::new(&base)).with_fuzzy_threshold(threshold))
    }

    pub fn fuzzy_threshold(&self) -> f64 {
        self.fuzzy_threshold
    }

    pub fn cache(&self) -> &Arc<DictionaryCache> {
        &self.cache
    }

    /// 匹配单个表头
    ///
    /// # 参数
    /// - header: 原始表头
    /// - domain: 数据域（None 表示全部域）
    ///
    /// # 返回
    /// - Ok(MatchResult): 未匹配时 matched = false
    /// - Err: 字典存储不可用
    pub async fn match_header(
        &self,
        header: &str,
        domain: Option<&str>,
    ) -> EngineResult<MatchResult> {
        let snapshot = self.cache.snapshot(domain).await?;
        Ok(self.match_in_snapshot(header, &snapshot))
    }

    /// 批量匹配表头，结果以表头为键（重复表头只计算一次）
    #[tracing::instrument(skip(self, headers), fields(header_count = headers.len()))]
    pub async fn match_all<S: AsRef<str>>(
        &self,
        headers: &[S],
        domain: Option<&str>,
    ) -> EngineResult<HashMap<String, MatchResult>> {
        let snapshot = self.cache.snapshot(domain).await?;

        let mut results = HashMap::with_capacity(headers.len());
        for header in headers {
            let header = header.as_ref();
            if results.contains_key(header) {
                continue;
            }
            results.insert(header.to_string(), self.match_in_snapshot(header, &snapshot));
        }

        let summary = MatchSummary::from_results(results.values());
        tracing::info!(
            domain = domain.unwrap_or("all"),
            matched = summary.matched,
            total = summary.total,
            success_rate = summary.success_rate(),
            "批量字段匹配完成"
        );
        Ok(results)
    }

    /// 在给定快照上匹配（纯计算）
    pub fn match_in_snapshot(&self, header: &str, snapshot: &DictionarySnapshot) -> MatchResult {
        if let Some(result) = exact_match(header, snapshot) {
            return result;
        }
        if let Some(result) = self.pattern_match(header, snapshot) {
            return result;
        }
        if let Some(result) = self.fuzzy_match(header, snapshot) {
            return result;
        }

        tracing::warn!(header = %header, "字段未匹配");
        MatchResult::unmatched()
    }

    fn pattern_match(&self, header: &str, snapshot: &DictionarySnapshot) -> Option<MatchResult> {
        let header = header.trim();

        for compiled in &snapshot.entries {
            let Some(re) = compiled.pattern.as_ref() else {
                continue;
            };
            let Some(caps) = re.captures(header) else {
                continue;
            };

            let mut dimensions = BTreeMap::new();
            for name in re.capture_names().flatten() {
                // 未参与匹配的可选组不输出
                let Some(raw) = caps.name(name) else {
                    continue;
                };
                let value = self.map_dimension(compiled, name, raw.as_str());
                dimensions.insert(name.to_string(), value);
            }

            tracing::debug!(
                header = %header,
                field_code = %compiled.entry.field_code,
                dimensions = ?dimensions,
                "模式匹配命中"
            );

            let mut result =
                MatchResult::hit(&compiled.entry, MatchMethod::Pattern, PATTERN_CONFIDENCE);
            result.dimensions = dimensions;
            result.pattern = compiled.entry.field_pattern.clone();
            return Some(result);
        }
        None
    }

    /// 按维度规则映射捕获值，无规则时原值透传
    fn map_dimension(&self, compiled: &CompiledEntry, name: &str, raw: &str) -> String {
        match compiled.entry.dimension_config.get(name) {
            Some(DimensionRule::Normalize) => self.normalizer.normalize(raw),
            Some(DimensionRule::Enum { mapping }) => mapping
                .get(raw)
                .cloned()
                .unwrap_or_else(|| raw.to_string()),
            Some(DimensionRule::Extract) | None => raw.to_string(),
        }
    }

    fn fuzzy_match(&self, header: &str, snapshot: &DictionarySnapshot) -> Option<MatchResult> {
        let header_chars: HashSet<char> = match_key(header).chars().collect();

        let mut best: Option<(&CompiledEntry, f64)> = None;
        for compiled in &snapshot.entries {
            if compiled.cn_name_key.is_empty() {
                continue;
            }
            let score = jaccard_similarity(&header_chars, &compiled.cn_name_chars);
            let best_score = best.map(|(_, s)| s).unwrap_or(0.0);
            // 严格大于: 并列时保留字典顺序中的第一个
            if score > best_score && score > self.fuzzy_threshold {
                best = Some((compiled, score));
            }
        }

        best.map(|(compiled, score)| {
            tracing::debug!(
                header = %header,
                field_code = %compiled.entry.field_code,
                score = score,
                "模糊匹配命中"
            );
            MatchResult::hit(&compiled.entry, MatchMethod::Fuzzy, score)
        })
    }
}

/// 精确匹配: 按字典顺序逐条比较 cn_name -> synonyms -> en_name
fn exact_match(header: &str, snapshot: &DictionarySnapshot) -> Option<MatchResult> {
    let key = match_key(header);
    if key.is_empty() {
        return None;
    }

    for compiled in &snapshot.entries {
        let method = if compiled.cn_name_key == key {
            MatchMethod::ExactCnName
        } else if compiled.synonym_keys.iter().any(|s| *s == key) {
            MatchMethod::ExactSynonym
        } else if compiled.en_name_key.as_deref() == Some(key.as_str()) {
            MatchMethod::ExactEnName
        } else {
            continue;
        };

        tracing::debug!(
            header = %header,
            field_code = %compiled.entry.field_code,
            method = %method,
            "精确匹配命中"
        );
        return Some(MatchResult::hit(&compiled.entry, method, 1.0));
    }
    None
}

/// 字符集 Jaccard 相似度: |交集| / |并集|
pub fn jaccard_similarity(a: &HashSet<char>, b: &HashSet<char>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
