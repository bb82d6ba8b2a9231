// ==========================================
// 送货单解析系统 - 单表处理引擎
// ==========================================
// 流程: 日期解析 + 分段 → (每段) 表头映射 → 明细抽取 → DeliveryNote
// 红线: 同步、无 IO、段与段之间无共享可变状态
// ==========================================

use crate::domain::delivery::{DeliveryNote, DeliveryRecord, Inconsistency};
use crate::domain::grid::Grid;
use crate::engine::consistency_checker::ConsistencyChecker;
use crate::engine::date_resolver::DateResolver;
use crate::engine::note_segmenter::NoteSegmenter;
use crate::engine::record_extractor::RecordExtractor;
use crate::importer::field_mapper::{ColumnMapping, HeaderMapper};
use chrono::{Local, NaiveDate};
use tracing::{debug, info, instrument};

// ==========================================
// DeliveryNoteEngine - 送货单引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct DeliveryNoteEngine {
    date_resolver: DateResolver,
    segmenter: NoteSegmenter,
    header_mapper: HeaderMapper,
    extractor: RecordExtractor,
    checker: ConsistencyChecker,
}

impl DeliveryNoteEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用自定义表头映射器
    pub fn with_header_mapper(header_mapper: HeaderMapper) -> Self {
        Self {
            header_mapper,
            ..Self::default()
        }
    }

    /// 处理单个工作表（未解析到日期时使用本地当天）
    pub fn process_sheet(&self, grid: &Grid) -> Vec<DeliveryNote> {
        self.process_sheet_at(grid, Local::now().date_naive())
    }

    /// 处理单个工作表,未解析到日期时使用 today
    ///
    /// # 返回
    /// 每个至少含一条有效商品的送货单段对应一个 DeliveryNote（按段顺序）
    #[instrument(skip(self, grid), fields(rows = grid.row_count()))]
    pub fn process_sheet_at(&self, grid: &Grid, today: NaiveDate) -> Vec<DeliveryNote> {
        let delivery_date = self.date_resolver.resolve_or_today(grid, today);
        let segments = self.segmenter.segment(grid);
        info!(%delivery_date, segments = segments.len(), "找到送货单");

        let mut notes = Vec::with_capacity(segments.len());
        for (index, segment) in segments.into_iter().enumerate() {
            let mapping = segment
                .header_row()
                .map(|header_row| self.header_mapper.map_headers(grid, header_row))
                .unwrap_or_else(ColumnMapping::new);

            let (products, stats) = self.extractor.extract_with_stats(grid, &segment, &mapping);
            debug!(
                index,
                start_row = segment.start_row,
                end_row = segment.end_row,
                extracted = stats.extracted,
                skipped = stats.skipped,
                discarded = stats.discarded,
                "送货单段处理完成"
            );

            if products.is_empty() {
                debug!(index, "送货单段无有效商品,忽略");
                continue;
            }

            let mut info = segment.info;
            info.delivery_date = Some(delivery_date);
            notes.push(DeliveryNote { info, products });
        }

        info!(notes = notes.len(), "工作表处理完成");
        notes
    }

    /// 价格一致性核查
    pub fn check_inconsistencies(&self, records: &[DeliveryRecord]) -> Vec<Inconsistency> {
        self.checker.find_inconsistencies(records)
    }
}

/// 使用默认引擎处理单个工作表
pub fn process_sheet(grid: &Grid) -> Vec<DeliveryNote> {
    DeliveryNoteEngine::new().process_sheet(grid)
}

/// 使用默认引擎进行价格一致性核查
pub fn check_inconsistencies(records: &[DeliveryRecord]) -> Vec<Inconsistency> {
    DeliveryNoteEngine::new().check_inconsistencies(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn two_note_grid() -> Grid {
        Grid::from_text_rows(vec![
            vec!["红山食堂送货单"],
            vec!["送货时间：2024年5月6日"],
            vec!["订货单位：红山食堂 送货单位：实孝商行"],
            vec!["序号", "商品名称", "单位", "订货数量", "执行单价", "金额"],
            vec!["1", "苹果", "斤", "10", "4.5", "45"],
            vec!["2", "香蕉", "斤", "2", "3", "6"],
            vec!["合计", "", "", "", "", "51"],
            vec!["制单员：张三"],
            vec!["订货单位：二食堂"],
            vec!["序号", "品名", "数量", "折扣率", "结算价"],
            vec!["1", "白菜", "3", "95%", "1.2"],
            vec!["制单员：李四"],
            vec!["订货单位：三食堂"],
            vec!["序号", "品名"],
            vec!["合计"],
        ])
    }

    #[test]
    fn test_process_sheet_multiple_notes() {
        let engine = DeliveryNoteEngine::new();
        let notes = engine.process_sheet_at(&two_note_grid(), ymd(2026, 1, 1));

        // 第三段无商品,不输出
        assert_eq!(notes.len(), 2);

        let first = &notes[0];
        assert_eq!(first.info.delivery_date, Some(ymd(2024, 5, 6)));
        assert_eq!(first.info.delivery_unit.as_deref(), Some("实孝商行"));
        assert_eq!(first.products.len(), 2);
        assert_eq!(first.products[1].product_name, "香蕉");
        assert_eq!(first.products[0].settlement_price, Decimal::from_str("4.5").unwrap());

        let second = &notes[1];
        assert_eq!(second.info.order_unit.as_deref(), Some("二食堂"));
        assert_eq!(second.info.delivery_unit, None);
        assert_eq!(second.info.delivery_date, Some(ymd(2024, 5, 6)));
        assert_eq!(second.products.len(), 1);
        assert_eq!(second.products[0].discount_rate, Decimal::from_str("0.95").unwrap());
    }

    #[test]
    fn test_process_sheet_without_date_uses_today() {
        let grid = Grid::from_text_rows(vec![
            vec!["订货单位：红山食堂"],
            vec!["序号", "商品名称"],
            vec!["1", "苹果"],
        ]);
        let today = ymd(2026, 10, 19);
        let notes = DeliveryNoteEngine::new().process_sheet_at(&grid, today);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].info.delivery_date, Some(today));
    }

    #[test]
    fn test_process_sheet_without_sentinels() {
        let grid = Grid::from_text_rows(vec![vec!["序号", "商品名称"], vec!["1", "苹果"]]);
        assert!(process_sheet(&grid).is_empty());
    }
}
