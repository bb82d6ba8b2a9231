// ==========================================
// 送货单解析系统 - 价格一致性核查
// ==========================================
// 职责: 按 (送货日期, 商品名称) 分组,找出结算价不唯一的分组
// 红线: 只读已落库记录,结果不落库
// ==========================================

use crate::domain::delivery::{DeliveryRecord, Inconsistency, InconsistencyRecord};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

struct PriceGroup<'a> {
    delivery_date: NaiveDate,
    product_name: &'a str,
    prices: BTreeSet<Decimal>,
    records: Vec<&'a DeliveryRecord>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsistencyChecker;

impl ConsistencyChecker {
    pub fn new() -> Self {
        Self
    }

    /// 找出同日同品存在多个结算价的分组
    ///
    /// 分组按首次出现顺序输出; 结算价按数值去重（10 与 10.00 视为同一价）
    pub fn find_inconsistencies(&self, records: &[DeliveryRecord]) -> Vec<Inconsistency> {
        let mut index: HashMap<(NaiveDate, &str), usize> = HashMap::new();
        let mut groups: Vec<PriceGroup> = Vec::new();

        for record in records {
            let key = (record.delivery_date, record.product_name.as_str());
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(PriceGroup {
                    delivery_date: record.delivery_date,
                    product_name: record.product_name.as_str(),
                    prices: BTreeSet::new(),
                    records: Vec::new(),
                });
                groups.len() - 1
            });

            let group = &mut groups[slot];
            group.prices.insert(record.settlement_price.normalize());
            group.records.push(record);
        }

        debug!(records = records.len(), groups = groups.len(), "价格分组完成");

        let inconsistencies: Vec<Inconsistency> = groups
            .into_iter()
            .filter(|g| g.prices.len() > 1)
            .map(|g| Inconsistency {
                delivery_date: g.delivery_date,
                product_name: g.product_name.to_string(),
                price_variants: g.prices,
                supporting_records: g.records.into_iter().map(InconsistencyRecord::from).collect(),
            })
            .collect();

        info!(count = inconsistencies.len(), "价格不一致核查完成");
        inconsistencies
    }
}

/// 使用默认核查器查找价格不一致
pub fn find_inconsistencies(records: &[DeliveryRecord]) -> Vec<Inconsistency> {
    ConsistencyChecker::new().find_inconsistencies(records)
}
