// ==========================================
// 送货单解析系统 - 表头字段映射器
// ==========================================
// 职责: 表头文本 → 语义字段 → 列下标
// 规则: 有序规则表,每列独立判定,首个命中的规则生效
// ==========================================

use crate::domain::delivery::FieldTag;
use crate::domain::grid::Grid;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

// ==========================================
// HeaderRule - 表头匹配规则
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct HeaderRule {
    pub tag: FieldTag,
    /// 任一关键字出现在表头文本中即命中
    pub keywords: &'static [&'static str],
}

impl HeaderRule {
    pub const fn new(tag: FieldTag, keywords: &'static [&'static str]) -> Self {
        Self { tag, keywords }
    }

    pub fn matches(&self, header: &str) -> bool {
        self.keywords.iter().any(|k| header.contains(k))
    }
}

/// 默认规则表（按优先级排列,顺序即优先级）
pub const DEFAULT_HEADER_RULES: &[HeaderRule] = &[
    HeaderRule::new(FieldTag::SerialNumber, &["序号"]),
    HeaderRule::new(FieldTag::ProductName, &["商品名称", "品名", "名称"]),
    HeaderRule::new(FieldTag::Specification, &["规格"]),
    HeaderRule::new(FieldTag::Quantity, &["订货数量", "数量"]),
    HeaderRule::new(FieldTag::Unit, &["单位"]),
    HeaderRule::new(FieldTag::SupplierPrice, &["原始单价", "报价"]),
    HeaderRule::new(FieldTag::DiscountRate, &["折扣率"]),
    HeaderRule::new(FieldTag::SettlementPrice, &["结算价", "执行单价"]),
    HeaderRule::new(FieldTag::Amount, &["金额", "合计"]),
];

// ==========================================
// ColumnMapping - 字段 → 列下标
// ==========================================
// 每个送货单段独立构建,不保证包含全部字段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    columns: BTreeMap<FieldTag, usize>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: FieldTag, column: usize) {
        self.columns.insert(tag, column);
    }

    pub fn get(&self, tag: FieldTag) -> Option<usize> {
        self.columns.get(&tag).copied()
    }

    pub fn contains(&self, tag: FieldTag) -> bool {
        self.columns.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldTag, usize)> + '_ {
        self.columns.iter().map(|(tag, col)| (*tag, *col))
    }
}

impl FromIterator<(FieldTag, usize)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (FieldTag, usize)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

// ==========================================
// HeaderMapper - 表头映射器
// ==========================================
#[derive(Debug, Clone)]
pub struct HeaderMapper {
    rules: Vec<HeaderRule>,
}

impl Default for HeaderMapper {
    fn default() -> Self {
        Self::with_rules(DEFAULT_HEADER_RULES.to_vec())
    }
}

impl HeaderMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用自定义规则表（顺序即优先级）
    pub fn with_rules(rules: Vec<HeaderRule>) -> Self {
        Self { rules }
    }

    /// 单个表头文本的字段判定（首个命中的规则生效）
    pub fn classify(&self, header: &str) -> Option<FieldTag> {
        let header = header.trim();
        if header.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(header))
            .map(|rule| rule.tag)
    }

    /// 构建指定表头行的列映射
    ///
    /// 多列命中同一字段时,靠右的列覆盖靠左的列;
    /// 无任何命中时返回空映射（合法,由抽取器回退默认值）
    pub fn map_headers(&self, grid: &Grid, header_row: usize) -> ColumnMapping {
        let mut mapping = ColumnMapping::new();

        if let Some(cells) = grid.row(header_row) {
            for (col, cell) in cells.iter().enumerate() {
                if let Some(tag) = self.classify(&cell.as_text()) {
                    mapping.insert(tag, col);
                }
            }
        }

        debug!(header_row, mapped = mapping.len(), mapping = ?mapping, "列映射结果");
        mapping
    }
}

/// 使用默认规则表构建列映射
pub fn map_headers(grid: &Grid, header_row: usize) -> ColumnMapping {
    HeaderMapper::default().map_headers(grid, header_row)
}
