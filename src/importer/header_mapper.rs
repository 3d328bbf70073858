// ==========================================
// 跨境电商数据中台 - 表头映射
// ==========================================
// 职责: 读取文件表头 → 逐列匹配标准字段 → 生成映射报告
// 说明: 重复表头只匹配一次，报告仍按文件列顺序逐列列出
// ==========================================

use crate::domain::match_result::{MatchResult, MatchSummary};
use crate::engine::currency_extractor::CurrencyExtractor;
use crate::engine::error::EngineError;
use crate::engine::pattern_matcher::PatternMatcher;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{HeaderParser, UniversalFileParser};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

// ==========================================
// ColumnMapping - 单列映射
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct ColumnMapping {
    pub column_index: usize,
    pub header: String,
    pub result: MatchResult,
    /// 表头文本中携带的货币（如 "销售额 (BRL)" → BRL）
    pub header_currency: Option<String>,
}

// ==========================================
// HeaderMappingReport - 映射报告
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct HeaderMappingReport {
    pub source: String,
    pub domain: Option<String>,
    pub columns: Vec<ColumnMapping>,
    pub unmatched_headers: Vec<String>,
    pub summary: MatchSummary,
}

impl HeaderMappingReport {
    /// 匹配成功率（百分比）
    pub fn success_rate(&self) -> f64 {
        self.summary.success_rate()
    }

    /// 按标准字段查找首个命中列
    pub fn column_for(&self, field_code: &str) -> Option<&ColumnMapping> {
        self.columns
            .iter()
            .find(|c| c.result.standard_field.as_deref() == Some(field_code))
    }
}

// ==========================================
// HeaderMapper
// ==========================================
pub struct HeaderMapper {
    matcher: Arc<PatternMatcher>,
    extractor: CurrencyExtractor,
    parser: Box<dyn HeaderParser>,
}

impl HeaderMapper {
    pub fn new(matcher: Arc<PatternMatcher>) -> ImportResult<Self> {
        Self::with_parser(matcher, Box::new(UniversalFileParser))
    }

    pub fn with_parser(
        matcher: Arc<PatternMatcher>,
        parser: Box<dyn HeaderParser>,
    ) -> ImportResult<Self> {
        let extractor = CurrencyExtractor::new().map_err(EngineError::from)?;
        Ok(Self {
            matcher,
            extractor,
            parser,
        })
    }

    /// 读取文件表头并映射
    ///
    /// # 参数
    /// - file_path: CSV / Excel 文件
    /// - domain: 数据域（None 表示全部域）
    pub async fn map_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        domain: Option<&str>,
    ) -> ImportResult<HeaderMappingReport> {
        let path = file_path.as_ref();
        let headers = self.parser.read_headers(path)?;
        tracing::info!(file = %path.display(), columns = headers.len(), "表头读取完成");
        self.map_headers(&path.display().to_string(), &headers, domain)
            .await
    }

    /// 映射给定表头
    pub async fn map_headers(
        &self,
        source: &str,
        headers: &[String],
        domain: Option<&str>,
    ) -> ImportResult<HeaderMappingReport> {
        let results = self.matcher.match_all(headers, domain).await?;

        let columns: Vec<ColumnMapping> = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| ColumnMapping {
                column_index: idx,
                header: header.clone(),
                result: results
                    .get(header)
                    .cloned()
                    .unwrap_or_else(MatchResult::unmatched),
                header_currency: self.extractor.extract_currency_code(header),
            })
            .collect();

        let unmatched_headers: Vec<String> = columns
            .iter()
            .filter(|c| !c.result.matched)
            .map(|c| c.header.clone())
            .collect();
        let summary = MatchSummary::from_results(columns.iter().map(|c| &c.result));

        if !unmatched_headers.is_empty() {
            tracing::warn!(
                source = source,
                unmatched = ?unmatched_headers,
                "存在未匹配的表头"
            );
        }

        Ok(HeaderMappingReport {
            source: source.to_string(),
            domain: domain.map(str::to_string),
            columns,
            unmatched_headers,
            summary,
        })
    }
}
