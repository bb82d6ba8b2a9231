// ==========================================
// 送货单解析系统 - 网格加载器实现
// ==========================================
// 阶段 0: 文件读取 → 每个工作表一个 Grid
// 支持: Excel (.xlsx/.xls/.xlsm/.xlsb) / CSV (.csv)
// ==========================================

use crate::domain::grid::{CellValue, Grid, NamedGrid};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::debug;

/// 网格加载器接口
pub trait GridLoader: Send + Sync {
    /// 读取文件中的全部工作表（按工作簿顺序）
    fn load_sheets(&self, file_path: &Path) -> ImportResult<Vec<NamedGrid>>;
}

fn check_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV 加载器
// ==========================================
pub struct CsvGridLoader;

impl GridLoader for CsvGridLoader {
    fn load_sheets(&self, file_path: &Path) -> ImportResult<Vec<NamedGrid>> {
        check_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        // 送货单没有固定表头行,按原样读入全部行
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(file_path)?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(csv_field_to_cell).collect());
        }

        let sheet_name = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet1")
            .to_string();

        debug!(sheet = %sheet_name, rows = rows.len(), "CSV 读取完成");

        Ok(vec![NamedGrid {
            sheet_name,
            grid: Grid::new(rows),
        }])
    }
}

fn csv_field_to_cell(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(field.to_string()),
    }
}

// ==========================================
// Excel 加载器
// ==========================================
pub struct ExcelGridLoader;

impl GridLoader for ExcelGridLoader {
    fn load_sheets(&self, file_path: &Path) -> ImportResult<Vec<NamedGrid>> {
        check_exists(file_path)?;

        let ext = extension_of(file_path);
        if !matches!(ext.as_str(), "xlsx" | "xls" | "xlsm" | "xlsb") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(ImportError::ExcelParseError("Excel 文件无工作表".to_string()));
        }

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for sheet_name in sheet_names {
            let range = workbook.worksheet_range(&sheet_name)?;
            let grid = range_to_grid(&range);

            debug!(sheet = %sheet_name, rows = grid.row_count(), "工作表读取完成");

            sheets.push(NamedGrid { sheet_name, grid });
        }

        Ok(sheets)
    }
}

/// 已用区域转网格: 补齐区域之前的行列,使网格坐标与工作表坐标一致
fn range_to_grid(range: &Range<Data>) -> Grid {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
    for data_row in range.rows() {
        let mut row = vec![CellValue::Empty; col_offset];
        row.extend(data_row.iter().map(excel_cell_to_cell));
        rows.push(row);
    }
    Grid::new(rows)
}

fn excel_cell_to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        // 日期单元格转为 YYYY-MM-DD 文本,便于日期解析器识别
        Data::DateTime(dt) => match cell.as_date() {
            Some(date) => CellValue::Text(date.format("%Y-%m-%d").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

// ==========================================
// 通用加载器（根据扩展名自动选择）
// ==========================================
pub struct WorkbookLoader;

impl GridLoader for WorkbookLoader {
    fn load_sheets(&self, file_path: &Path) -> ImportResult<Vec<NamedGrid>> {
        match extension_of(file_path).as_str() {
            "csv" => CsvGridLoader.load_sheets(file_path),
            "xlsx" | "xls" | "xlsm" | "xlsb" => ExcelGridLoader.load_sheets(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// 读取文件中的全部工作表
pub fn load_sheets<P: AsRef<Path>>(file_path: P) -> ImportResult<Vec<NamedGrid>> {
    WorkbookLoader.load_sheets(file_path.as_ref())
}
