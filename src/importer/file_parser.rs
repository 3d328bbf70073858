// ==========================================
// 跨境电商数据中台 - 表头读取
// ==========================================
// 支持: Excel (.xlsx/.xls/.xlsb/.ods, 首个工作表) / CSV (.csv)
// 输出: 首行表头，保持列顺序，去除首尾空白
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

// ==========================================
// HeaderParser Trait
// ==========================================
pub trait HeaderParser: Send + Sync {
    /// 读取表头行
    ///
    /// # 返回
    /// - Ok(Vec<String>): 按列顺序的表头（空单元格为空串）
    /// - Err: 文件不存在 / 格式不支持 / 解析失败 / 表头全空
    fn read_headers(&self, file_path: &Path) -> ImportResult<Vec<String>>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn finish_headers(path: &Path, headers: Vec<String>) -> ImportResult<Vec<String>> {
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ImportError::EmptyHeader(path.display().to_string()));
    }
    Ok(headers)
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl HeaderParser for CsvParser {
    fn read_headers(&self, file_path: &Path) -> ImportResult<Vec<String>> {
        let path = file_path;
        ensure_exists(path)?;

        // 检查扩展名（无扩展名视为 CSV）
        if let Some(ext) = path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        finish_headers(path, headers)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl HeaderParser for ExcelParser {
    fn read_headers(&self, file_path: &Path) -> ImportResult<Vec<String>> {
        let path = file_path;
        ensure_exists(path)?;

        let mut workbook = open_workbook_auto(path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let header_row = range
            .rows()
            .next()
            .ok_or_else(|| ImportError::EmptyHeader(path.display().to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        tracing::debug!(sheet = %sheet_name, columns = headers.len(), "Excel 表头已读取");
        finish_headers(path, headers)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl HeaderParser for UniversalFileParser {
    fn read_headers(&self, file_path: &Path) -> ImportResult<Vec<String>> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.read_headers(file_path),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => ExcelParser.read_headers(file_path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_csv_headers_in_column_order() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "\u{feff}订单号, 销售额 (已付款订单) (BRL) ,币种").unwrap();
        writeln!(temp_file, "A001,12.50,BRL").unwrap();

        let headers = CsvParser.read_headers(temp_file.path()).unwrap();
        assert_eq!(headers, vec!["订单号", "销售额 (已付款订单) (BRL)", "币种"]);
    }

    #[test]
    fn test_csv_file_not_found() {
        let result = CsvParser.read_headers(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_blank_header_row_is_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, " , ").unwrap();
        writeln!(temp_file, "A001,1").unwrap();

        let result = CsvParser.read_headers(temp_file.path());
        assert!(matches!(result, Err(ImportError::EmptyHeader(_))));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.read_headers(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(ext)) if ext == "txt"));
    }
}
