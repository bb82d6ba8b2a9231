// ==========================================
// 送货单解析系统 - 字段标准化工具
// ==========================================
// 职责: 文本 TRIM / 数值清洗 / 折扣率百分比归一 / 序号解析
// 约束: 纯函数,出错返回 ImportError,由调用方决定丢弃整行
// ==========================================

use crate::domain::delivery::FieldTag;
use crate::domain::grid::CellValue;
use crate::importer::error::{ImportError, ImportResult};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 未映射折扣率列时的默认值（100%）
pub const DEFAULT_DISCOUNT_RATE: Decimal = Decimal::ONE_HUNDRED;

/// 文本字段: 单元格文本去除首尾空白
pub fn clean_text(cell: &CellValue) -> String {
    cell.as_text().trim().to_string()
}

/// 数值清洗: 只保留数字与小数点（全角数字转为半角）
///
/// 负号、千分位、货币符号、"%" 等全部剔除
pub fn clean_numeric(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '0'..='9' | '.' => Some(c),
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32),
            _ => None,
        })
        .collect()
}

/// 解析数值字段
///
/// # 返回
/// - Ok(Decimal): 清洗后可解析
/// - Err(TypeConversionError): 空值、清洗后无法解析,或超出 Decimal 精度（28 位有效数字）
///
/// 注意: 超长数值不做近似,与其他无法解析的值一样使整行被丢弃
pub fn parse_decimal(cell: &CellValue, row: usize, field: FieldTag) -> ImportResult<Decimal> {
    let raw = cell.as_text();
    let cleaned = clean_numeric(&raw);
    Decimal::from_str(&cleaned).map_err(|_| ImportError::TypeConversionError {
        row,
        field: field.to_string(),
        message: format!("无法解析为数值: {:?}", raw),
    })
}

/// 折扣率归一: 大于 1 视为百分比（90 → 0.9）,否则视为已是小数
///
/// 注意: 无法区分大于 1 的真实小数费率（如加价）
pub fn normalize_discount(raw: Decimal) -> Decimal {
    if raw > Decimal::ONE {
        raw / Decimal::ONE_HUNDRED
    } else {
        raw
    }
}

/// 解析序号: 数字单元格截断取整,文本单元格须为整数
pub fn parse_serial_number(cell: &CellValue, row: usize) -> ImportResult<i64> {
    let conversion_error = |message: String| ImportError::TypeConversionError {
        row,
        field: FieldTag::SerialNumber.to_string(),
        message,
    };

    match cell {
        CellValue::Number(n) if n.is_finite() => Ok(n.trunc() as i64),
        CellValue::Number(n) => Err(conversion_error(format!("无法解析为整数: {}", n))),
        CellValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| conversion_error(format!("无法解析为整数: {:?}", s))),
        CellValue::Empty => Err(conversion_error("序号为空".to_string())),
    }
}
