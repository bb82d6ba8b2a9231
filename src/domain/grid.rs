// ==========================================
// 送货单解析系统 - 表格网格模型
// ==========================================
// 职责: 一个工作表的只读二维单元格视图
// 红线: 引擎只做下标访问,从不修改网格
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 单元格取值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// 空单元格或仅含空白字符的文本
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
        }
    }

    /// 单元格的文本表示
    ///
    /// - Empty → ""
    /// - 整数值的数字不带小数部分（3.0 → "3"）
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ==========================================
// Grid - 工作表网格
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// 由字符串二维数组构造（空字符串视为空单元格），主要用于测试与 CSV
    pub fn from_text_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| CellValue::from(s.as_ref())).collect())
            .collect();
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 最后一行下标（空网格返回 None）
    pub fn last_row(&self) -> Option<usize> {
        self.rows.len().checked_sub(1)
    }

    pub fn row(&self, row: usize) -> Option<&[CellValue]> {
        self.rows.get(row).map(|r| r.as_slice())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// 越界访问返回空单元格（允许参差行）
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// 行文本: 所有非空单元格文本以单个空格拼接
    pub fn row_text(&self, row: usize) -> String {
        self.row(row).map(join_row_text).unwrap_or_default()
    }
}

pub fn join_row_text(cells: &[CellValue]) -> String {
    cells
        .iter()
        .filter(|c| !c.is_blank())
        .map(|c| c.as_text())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 带工作表名称的网格
#[derive(Debug, Clone, PartialEq)]
pub struct NamedGrid {
    pub sheet_name: String,
    pub grid: Grid,
}
