// ==========================================
// 送货单解析系统 - 商品明细抽取器
// ==========================================
// 职责: 按列映射逐行读取送货单段表体,标准化为 ProductRecord
// 行处理顺序:
//   1) 终止检查: 首列为空或含终止词 → 停止（本行及后续行均不处理）
//   2) 必填检查: 商品名称列为空 → 跳过本行,继续下一行
//   3) 字段标准化: 失败 → 丢弃本行,继续下一行
//   4) 有效性检查: 名称非空且不以"序号"开头
// ==========================================

use crate::domain::delivery::{DeliveryNoteSegment, FieldTag, ProductRecord};
use crate::domain::grid::{CellValue, Grid};
use crate::importer::data_cleaner::{
    clean_text, normalize_discount, parse_decimal, parse_serial_number, DEFAULT_DISCOUNT_RATE,
};
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::ColumnMapping;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

/// 首列出现即终止抽取的词
pub const TERMINATOR_WORDS: &[&str] = &["合计", "总计", "总金额", "小计", "制单员"];

/// 未映射商品名称列时的回退列（紧随序号列之后）
pub const FALLBACK_PRODUCT_NAME_COLUMN: usize = 1;

const HEADER_TOKEN: &str = "序号";

/// 单个送货单段的抽取统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub extracted: usize,
    /// 商品名称为空或未通过有效性检查的行
    pub skipped: usize,
    /// 字段标准化失败的行
    pub discarded: usize,
    /// 触发终止的行号
    pub terminated_at: Option<usize>,
}

/// 终止行判定: 首列为空,或首列文本含终止词
pub fn is_terminator(first_cell: &CellValue) -> bool {
    if first_cell.is_blank() {
        return true;
    }
    let text = first_cell.as_text();
    TERMINATOR_WORDS.iter().any(|word| text.contains(word))
}

// ==========================================
// RecordExtractor - 明细抽取器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordExtractor;

impl RecordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 抽取送货单段的商品明细（按表体行序）
    pub fn extract(
        &self,
        grid: &Grid,
        segment: &DeliveryNoteSegment,
        mapping: &ColumnMapping,
    ) -> Vec<ProductRecord> {
        self.extract_with_stats(grid, segment, mapping).0
    }

    /// 抽取商品明细并返回统计
    pub fn extract_with_stats(
        &self,
        grid: &Grid,
        segment: &DeliveryNoteSegment,
        mapping: &ColumnMapping,
    ) -> (Vec<ProductRecord>, ExtractionStats) {
        let mut records = Vec::new();
        let mut stats = ExtractionStats::default();

        let row_count = grid.row_count();
        if segment.start_row >= row_count
            || segment.end_row >= row_count
            || segment.is_empty_body()
        {
            debug!(
                start_row = segment.start_row,
                end_row = segment.end_row,
                row_count,
                "送货单段超出网格范围或表体为空"
            );
            return (records, stats);
        }

        let name_column = mapping
            .get(FieldTag::ProductName)
            .unwrap_or(FALLBACK_PRODUCT_NAME_COLUMN);

        for row in segment.start_row..=segment.end_row {
            if is_terminator(grid.cell(row, 0)) {
                debug!(row, "遇到终止行,停止读取");
                stats.terminated_at = Some(row);
                break;
            }

            if grid.cell(row, name_column).is_blank() {
                stats.skipped += 1;
                continue;
            }

            match normalize_row(grid, row, segment.start_row, name_column, mapping) {
                Ok(record) if is_valid(&record) => {
                    records.push(record);
                    stats.extracted += 1;
                }
                Ok(record) => {
                    debug!(row, name = %record.product_name, "跳过疑似表头行");
                    stats.skipped += 1;
                }
                Err(e) => {
                    warn!(row, error = %e, "处理商品数据行出错,丢弃该行");
                    stats.discarded += 1;
                }
            }
        }

        debug!(?stats, "商品明细抽取完成");
        (records, stats)
    }
}

fn is_valid(record: &ProductRecord) -> bool {
    !record.product_name.is_empty() && !record.product_name.starts_with(HEADER_TOKEN)
}

fn text_field(grid: &Grid, row: usize, mapping: &ColumnMapping, tag: FieldTag) -> String {
    mapping
        .get(tag)
        .map(|col| clean_text(grid.cell(row, col)))
        .unwrap_or_default()
}

fn decimal_field(
    grid: &Grid,
    row: usize,
    mapping: &ColumnMapping,
    tag: FieldTag,
    default: Decimal,
) -> ImportResult<Decimal> {
    match mapping.get(tag) {
        Some(col) => parse_decimal(grid.cell(row, col), row, tag),
        None => Ok(default),
    }
}

fn normalize_row(
    grid: &Grid,
    row: usize,
    start_row: usize,
    name_column: usize,
    mapping: &ColumnMapping,
) -> ImportResult<ProductRecord> {
    let serial_number = match mapping.get(FieldTag::SerialNumber) {
        Some(col) => parse_serial_number(grid.cell(row, col), row)?,
        None => (row - start_row + 1) as i64,
    };

    let raw_discount = decimal_field(
        grid,
        row,
        mapping,
        FieldTag::DiscountRate,
        DEFAULT_DISCOUNT_RATE,
    )?;

    Ok(ProductRecord {
        serial_number,
        product_name: clean_text(grid.cell(row, name_column)),
        specification: text_field(grid, row, mapping, FieldTag::Specification),
        quantity: decimal_field(grid, row, mapping, FieldTag::Quantity, Decimal::ZERO)?,
        unit: text_field(grid, row, mapping, FieldTag::Unit),
        supplier_price: decimal_field(grid, row, mapping, FieldTag::SupplierPrice, Decimal::ZERO)?,
        discount_rate: normalize_discount(raw_discount),
        settlement_price: decimal_field(
            grid,
            row,
            mapping,
            FieldTag::SettlementPrice,
            Decimal::ZERO,
        )?,
        amount: decimal_field(grid, row, mapping, FieldTag::Amount, Decimal::ZERO)?,
    })
}

/// 使用默认抽取器抽取商品明细
pub fn extract(
    grid: &Grid,
    segment: &DeliveryNoteSegment,
    mapping: &ColumnMapping,
) -> Vec<ProductRecord> {
    RecordExtractor::new().extract(grid, segment, mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delivery::NoteInfo;
    use crate::importer::field_mapper::map_headers;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn segment(start_row: usize, end_row: usize) -> DeliveryNoteSegment {
        DeliveryNoteSegment {
            start_row,
            end_row,
            info: NoteInfo::default(),
        }
    }

    fn sample_grid() -> Grid {
        Grid::from_text_rows(vec![
            vec!["订货单位：红山食堂"],
            vec!["序号", "商品名称", "单位", "订货数量", "原始单价", "折扣率", "执行单价", "金额"],
            vec!["1", "苹果", "斤", "10", "5.00", "90", "4.50", "45.00"],
            vec!["2", "香蕉", "斤", "4", "3", "0.8", "2.4", "9.6"],
            vec!["小计", "", "", "", "", "", "", "54.60"],
            vec!["3", "不应读取", "斤", "1", "1", "100", "1", "1"],
        ])
    }

    #[test]
    fn test_extract_stops_at_terminator() {
        let grid = sample_grid();
        let mapping = map_headers(&grid, 1);
        let (records, stats) = RecordExtractor::new().extract_with_stats(&grid, &segment(2, 5), &mapping);

        assert_eq!(records.len(), 2);
        assert_eq!(stats.terminated_at, Some(4));
        assert!(records.iter().all(|r| r.product_name != "不应读取"));

        let apple = &records[0];
        assert_eq!(apple.serial_number, 1);
        assert_eq!(apple.product_name, "苹果");
        assert_eq!(apple.unit, "斤");
        assert_eq!(apple.quantity, dec("10"));
        assert_eq!(apple.supplier_price, dec("5"));
        assert_eq!(apple.discount_rate, dec("0.9"));
        assert_eq!(apple.settlement_price, dec("4.5"));
        assert_eq!(apple.amount, dec("45"));
        assert_eq!(apple.specification, "");

        assert_eq!(records[1].discount_rate, dec("0.8"));
    }

    #[test]
    fn test_empty_first_cell_stops_but_empty_name_skips() {
        let grid = Grid::from_text_rows(vec![
            vec!["序号", "商品名称", "数量"],
            vec!["1", "苹果", "1"],
            vec!["2", "", "1"],
            vec!["3", "梨", "2"],
            vec!["", "桃", "3"],
            vec!["5", "李", "4"],
        ]);
        let mapping = map_headers(&grid, 0);
        let (records, stats) = RecordExtractor::new().extract_with_stats(&grid, &segment(1, 5), &mapping);

        let names: Vec<&str> = records.iter().map(|r| r.product_name.as_str()).collect();
        assert_eq!(names, vec!["苹果", "梨"]);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.terminated_at, Some(4));
    }

    #[test]
    fn test_unrecognized_header_uses_defaults() {
        let grid = Grid::from_text_rows(vec![
            vec!["A", "B", "C"],
            vec!["x", "白菜", "abc"],
            vec!["y", "萝卜", "def"],
        ]);
        let mapping = map_headers(&grid, 0);
        assert!(mapping.is_empty());

        let records = extract(&grid, &segment(1, 2), &mapping);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_name, "白菜");
        assert_eq!(records[0].serial_number, 1);
        assert_eq!(records[1].serial_number, 2);
        assert_eq!(records[0].discount_rate, Decimal::ONE);
        assert_eq!(records[0].quantity, Decimal::ZERO);
        assert_eq!(records[0].unit, "");
    }

    #[test]
    fn test_bad_numeric_row_is_discarded() {
        let grid = Grid::from_text_rows(vec![
            vec!["序号", "商品名称", "数量"],
            vec!["1", "苹果", "见备注"],
            vec!["2", "香蕉", "3"],
            vec!["三", "梨", "3"],
        ]);
        let mapping = map_headers(&grid, 0);
        let (records, stats) = RecordExtractor::new().extract_with_stats(&grid, &segment(1, 3), &mapping);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_name, "香蕉");
        assert_eq!(stats.discarded, 2);
        assert_eq!(stats.terminated_at, None);
    }

    #[test]
    fn test_overlong_quantity_discards_only_that_row() {
        let overlong = "9".repeat(32);
        let grid = Grid::from_text_rows(vec![
            vec!["序号", "商品名称", "数量"],
            vec!["1", "苹果", "2"],
            vec!["2", "梨", overlong.as_str()],
            vec!["3", "桃", "5"],
        ]);
        let mapping = map_headers(&grid, 0);
        let (records, stats) = RecordExtractor::new().extract_with_stats(&grid, &segment(1, 3), &mapping);

        let names: Vec<&str> = records.iter().map(|r| r.product_name.as_str()).collect();
        assert_eq!(names, vec!["苹果", "桃"]);
        assert_eq!(stats.discarded, 1);
    }

    #[test]
    fn test_repeated_header_row_is_not_captured() {
        let grid = Grid::from_text_rows(vec![
            vec!["序号", "品名"],
            vec!["1", "苹果"],
            vec!["x", "序号/品名"],
        ]);
        let mapping = map_headers(&grid, 0);
        // 去掉序号列映射,序号按行位置编号
        let mapping: ColumnMapping = mapping
            .iter()
            .filter(|(tag, _)| *tag != FieldTag::SerialNumber)
            .collect();
        let (records, stats) = RecordExtractor::new().extract_with_stats(&grid, &segment(1, 2), &mapping);

        assert_eq!(records.len(), 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_segment_out_of_bounds_yields_nothing() {
        let grid = sample_grid();
        let mapping = map_headers(&grid, 1);
        assert!(extract(&grid, &segment(10, 12), &mapping).is_empty());
        assert!(extract(&grid, &segment(2, 99), &mapping).is_empty());
        assert!(extract(&grid, &segment(3, 2), &mapping).is_empty());
    }

    #[test]
    fn test_is_terminator() {
        assert!(is_terminator(&CellValue::Empty));
        assert!(is_terminator(&CellValue::Text("  ".to_string())));
        assert!(is_terminator(&CellValue::Text("合计：".to_string())));
        assert!(is_terminator(&CellValue::Text("总金额".to_string())));
        assert!(is_terminator(&CellValue::Text("制单员：张三".to_string())));
        assert!(!is_terminator(&CellValue::Number(1.0)));
        assert!(!is_terminator(&CellValue::Text("苹果".to_string())));
    }
}
