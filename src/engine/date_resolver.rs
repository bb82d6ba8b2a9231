// ==========================================
// 送货单解析系统 - 送货日期解析器
// ==========================================
// 职责: 从非结构化文本中确定工作表的送货日期
// 策略: 1) 逐行匹配 "送货时间：<日期>"  2) 逐单元格匹配裸日期
//       3) 均未命中返回 None,由调用方回退为处理当天
// 红线: 非法日期视为未命中,从不报错
// ==========================================

use crate::domain::grid::Grid;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, warn};

lazy_static! {
    /// 带标签的送货时间（中文年月日 或 YYYY-MM-DD）
    static ref LABELED_DATE: Regex = Regex::new(
        r"送货时间[：:]\s*(?:(?P<cy>\d{4})年(?P<cm>\d{1,2})月(?P<cd>\d{1,2})日|(?P<iy>\d{4})-(?P<im>\d{1,2})-(?P<id>\d{1,2}))"
    )
    .expect("送货时间正则非法");

    /// 裸日期（中文年月日 或 YYYY-MM-DD）
    static ref BARE_DATE: Regex = Regex::new(
        r"(?:(?P<cy>\d{4})年(?P<cm>\d{1,2})月(?P<cd>\d{1,2})日|(?P<iy>\d{4})-(?P<im>\d{1,2})-(?P<id>\d{1,2}))"
    )
    .expect("日期正则非法");
}

/// 由捕获组构造日期（非法日历日期返回 None）
fn date_from_captures(caps: &Captures) -> Option<NaiveDate> {
    let (y, m, d) = if caps.name("cy").is_some() {
        (caps.name("cy")?, caps.name("cm")?, caps.name("cd")?)
    } else {
        (caps.name("iy")?, caps.name("im")?, caps.name("id")?)
    };

    let year: i32 = y.as_str().parse().ok()?;
    let month: u32 = m.as_str().parse().ok()?;
    let day: u32 = d.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn first_valid_date(pattern: &Regex, text: &str) -> Option<NaiveDate> {
    pattern.captures_iter(text).find_map(|caps| {
        let date = date_from_captures(&caps);
        if date.is_none() {
            debug!(token = %caps.get(0).map(|m| m.as_str()).unwrap_or(""), "日期格式转换失败,继续查找");
        }
        date
    })
}

// ==========================================
// DateResolver - 送货日期解析器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct DateResolver;

impl DateResolver {
    pub fn new() -> Self {
        Self
    }

    /// 解析工作表送货日期
    ///
    /// # 返回
    /// - Some(NaiveDate): 标签匹配或兜底扫描命中
    /// - None: 全表无可识别日期
    pub fn resolve(&self, grid: &Grid) -> Option<NaiveDate> {
        if let Some(date) = self.resolve_labeled(grid) {
            debug!(%date, "找到送货日期");
            return Some(date);
        }

        debug!("未找到带标签的送货日期,逐单元格查找");
        let date = self.resolve_bare(grid);
        if let Some(date) = date {
            debug!(%date, "通过单元格兜底扫描找到送货日期");
        }
        date
    }

    /// 解析工作表送货日期,未命中时回退为 today
    pub fn resolve_or_today(&self, grid: &Grid, today: NaiveDate) -> NaiveDate {
        self.resolve(grid).unwrap_or_else(|| {
            warn!(%today, "未找到送货日期,使用当前日期");
            today
        })
    }

    /// 策略 1: 按行拼接文本,匹配 "送货时间：<日期>"
    pub fn resolve_labeled(&self, grid: &Grid) -> Option<NaiveDate> {
        (0..grid.row_count()).find_map(|row| first_valid_date(&LABELED_DATE, &grid.row_text(row)))
    }

    /// 策略 2: 逐单元格匹配裸日期
    pub fn resolve_bare(&self, grid: &Grid) -> Option<NaiveDate> {
        grid.rows()
            .flat_map(|cells| cells.iter())
            .filter(|cell| !cell.is_blank())
            .find_map(|cell| first_valid_date(&BARE_DATE, &cell.as_text()))
    }
}

/// 使用默认解析器解析送货日期
pub fn resolve_date(grid: &Grid) -> Option<NaiveDate> {
    DateResolver::new().resolve(grid)
}
