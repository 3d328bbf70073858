// ==========================================
// 跨境电商数据中台 - 导入层
// ==========================================
// 职责: 读取平台导出文件的表头并映射到标准字段
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod file_parser;
pub mod header_mapper;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, HeaderParser, UniversalFileParser};
pub use header_mapper::{ColumnMapping, HeaderMapper, HeaderMappingReport};
