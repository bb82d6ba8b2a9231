// ==========================================
// 送货单解析系统 - 送货单领域模型
// ==========================================
// 职责: 送货单头信息、商品明细、持久化记录、价格不一致结果
// 红线: 不含数据访问逻辑,不含解析逻辑
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 订货单位/送货单位缺失时落库使用的占位值
pub const UNKNOWN_UNIT: &str = "未知";

// ==========================================
// FieldTag - 商品字段语义标签
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTag {
    SerialNumber,
    ProductName,
    Specification,
    Quantity,
    Unit,
    SupplierPrice,
    DiscountRate,
    SettlementPrice,
    Amount,
}

impl FieldTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldTag::SerialNumber => "serial_number",
            FieldTag::ProductName => "product_name",
            FieldTag::Specification => "specification",
            FieldTag::Quantity => "quantity",
            FieldTag::Unit => "unit",
            FieldTag::SupplierPrice => "supplier_price",
            FieldTag::DiscountRate => "discount_rate",
            FieldTag::SettlementPrice => "settlement_price",
            FieldTag::Amount => "amount",
        }
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// NoteInfo - 送货单头信息
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInfo {
    pub delivery_date: Option<NaiveDate>, // 送货日期
    pub order_unit: Option<String>,       // 订货单位
    pub delivery_unit: Option<String>,    // 送货单位
}

impl NoteInfo {
    /// 订货单位（缺失时为占位值）
    pub fn order_unit_or<'a>(&'a self, unknown: &'a str) -> &'a str {
        self.order_unit.as_deref().unwrap_or(unknown)
    }

    /// 送货单位（缺失时为占位值）
    pub fn delivery_unit_or<'a>(&'a self, unknown: &'a str) -> &'a str {
        self.delivery_unit.as_deref().unwrap_or(unknown)
    }
}

// ==========================================
// ProductRecord - 商品明细
// ==========================================
// 不变量: product_name 非空,且不以"序号"开头
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub serial_number: i64,         // 序号
    pub product_name: String,       // 商品名称
    pub specification: String,      // 规格
    pub quantity: Decimal,          // 数量
    pub unit: String,               // 单位
    pub supplier_price: Decimal,    // 供应商报价
    pub discount_rate: Decimal,     // 折扣率（0-1 小数）
    pub settlement_price: Decimal,  // 结算价
    pub amount: Decimal,            // 金额
}

// ==========================================
// DeliveryNoteSegment - 网格内的送货单行区间
// ==========================================
// start_row/end_row 为闭区间; start_row > end_row 合法（表体为空）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryNoteSegment {
    pub start_row: usize,
    pub end_row: usize,
    pub info: NoteInfo,
}

impl DeliveryNoteSegment {
    /// 表头行（紧邻数据起始行的上一行）
    pub fn header_row(&self) -> Option<usize> {
        self.start_row.checked_sub(1)
    }

    pub fn is_empty_body(&self) -> bool {
        self.start_row > self.end_row
    }
}

// ==========================================
// DeliveryNote - 输出单元
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryNote {
    pub info: NoteInfo,
    pub products: Vec<ProductRecord>,
}

// ==========================================
// DeliveryRecord - 已落库的商品记录
// ==========================================
// 对齐: delivery_record 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: i64,
    pub file_name: String,
    pub delivery_date: NaiveDate,
    pub ordering_unit: String,
    pub delivery_unit: String,
    pub serial_number: i64,
    pub product_name: String,
    pub specification: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub supplier_price: Decimal,
    pub discount_rate: Decimal,
    pub settlement_price: Decimal,
    pub amount: Decimal,
    pub created_time: NaiveDateTime,
    pub updated_time: NaiveDateTime,
}

// ==========================================
// Inconsistency - 同日同品多价
// ==========================================
// 每次核查时从记录重新计算,不落库

/// 支撑记录（供人工核对来源）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InconsistencyRecord {
    pub record_id: i64,
    pub file_name: String,
    pub ordering_unit: String,
    pub delivery_unit: String,
    pub settlement_price: Decimal,
    pub created_time: NaiveDateTime,
}

impl From<&DeliveryRecord> for InconsistencyRecord {
    fn from(record: &DeliveryRecord) -> Self {
        Self {
            record_id: record.id,
            file_name: record.file_name.clone(),
            ordering_unit: record.ordering_unit.clone(),
            delivery_unit: record.delivery_unit.clone(),
            settlement_price: record.settlement_price,
            created_time: record.created_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inconsistency {
    pub delivery_date: NaiveDate,
    pub product_name: String,
    pub price_variants: BTreeSet<Decimal>,
    pub supporting_records: Vec<InconsistencyRecord>,
}

/// 价格不一致核查报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InconsistencyReport {
    pub count: usize,
    pub inconsistencies: Vec<Inconsistency>,
}

impl From<Vec<Inconsistency>> for InconsistencyReport {
    fn from(inconsistencies: Vec<Inconsistency>) -> Self {
        Self {
            count: inconsistencies.len(),
            inconsistencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_info_unknown_fallback() {
        let info = NoteInfo {
            delivery_date: None,
            order_unit: Some("红山食堂".to_string()),
            delivery_unit: None,
        };
        assert_eq!(info.order_unit_or(UNKNOWN_UNIT), "红山食堂");
        assert_eq!(info.delivery_unit_or(UNKNOWN_UNIT), "未知");
    }

    #[test]
    fn test_segment_empty_body() {
        let segment = DeliveryNoteSegment {
            start_row: 5,
            end_row: 4,
            info: NoteInfo::default(),
        };
        assert!(segment.is_empty_body());
        assert_eq!(segment.header_row(), Some(4));
    }

    #[test]
    fn test_field_tag_serde_name() {
        let json = serde_json::to_string(&FieldTag::SettlementPrice).unwrap();
        assert_eq!(json, "\"settlement_price\"");
        assert_eq!(FieldTag::DiscountRate.to_string(), "discount_rate");
    }
}
