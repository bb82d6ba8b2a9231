// ==========================================
// 送货单解析系统 - 送货单分段器
// ==========================================
// 职责: 自上而下扫描网格,按起止标记行切出送货单段
// 起始标记: "订货单位：" (全角/半角冒号)
// 结束标记: "制单员："   (全角/半角冒号)
// ==========================================
// 注: 数据起始行固定为起始标记行 + 2（中间一行为列表头）;
//     标记行与表头之间若多出空行会导致列映射错位,此处保持原有偏移
// ==========================================

use crate::domain::delivery::{DeliveryNoteSegment, NoteInfo};
use crate::domain::grid::Grid;
use lazy_static::lazy_static;
use regex::Regex;
use std::mem;
use tracing::debug;

/// 起始标记行到数据起始行的偏移
pub const HEADER_OFFSET: usize = 2;

lazy_static! {
    static ref START_MARKER: Regex = Regex::new(r"订货单位[：:]").expect("订货单位正则非法");
    static ref END_MARKER: Regex = Regex::new(r"制单员[：:]").expect("制单员正则非法");
    static ref ORDER_UNIT: Regex = Regex::new(r"订货单位[：:]\s*(.+)").expect("订货单位正则非法");
    static ref DELIVERY_UNIT: Regex =
        Regex::new(r"送货单位[：:]\s*(.+)").expect("送货单位正则非法");
}

/// 标记行类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelKind {
    Start,
    End,
}

/// 判定行文本的标记类型（同时含起止标记时按起始处理）
pub fn classify_row(row_text: &str) -> Option<SentinelKind> {
    if START_MARKER.is_match(row_text) {
        Some(SentinelKind::Start)
    } else if END_MARKER.is_match(row_text) {
        Some(SentinelKind::End)
    } else {
        None
    }
}

fn capture_trimmed(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 从起始标记行文本提取订货单位/送货单位
///
/// 捕获标记之后直到行尾的全部文本
pub fn parse_note_info(row_text: &str) -> NoteInfo {
    NoteInfo {
        delivery_date: None,
        order_unit: capture_trimmed(&ORDER_UNIT, row_text),
        delivery_unit: capture_trimmed(&DELIVERY_UNIT, row_text),
    }
}

// ==========================================
// SegmentCursor - 分段状态机
// ==========================================
// 状态: Scanning（无打开段） / InSegment（有打开段）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum CursorState {
    #[default]
    Scanning,
    InSegment {
        start_row: usize,
        info: NoteInfo,
    },
}

#[derive(Debug, Default)]
pub struct SegmentCursor {
    state: CursorState,
}

impl SegmentCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, CursorState::InSegment { .. })
    }

    fn close(&mut self, end_row: usize) -> Option<DeliveryNoteSegment> {
        match mem::take(&mut self.state) {
            CursorState::Scanning => None,
            CursorState::InSegment { start_row, info } => Some(DeliveryNoteSegment {
                start_row,
                end_row,
                info,
            }),
        }
    }

    /// 起始标记: 关闭已打开的段（止于上一行）,并打开新段
    pub fn on_start(&mut self, row: usize, info: NoteInfo) -> Option<DeliveryNoteSegment> {
        let closed = self.close(row.saturating_sub(1));
        self.state = CursorState::InSegment {
            start_row: row + HEADER_OFFSET,
            info,
        };
        closed
    }

    /// 结束标记: 关闭已打开的段（止于上一行）; 无打开段时忽略
    pub fn on_end(&mut self, row: usize) -> Option<DeliveryNoteSegment> {
        self.close(row.saturating_sub(1))
    }

    /// 网格扫描结束: 仍打开的段止于最后一行
    pub fn finish(&mut self, last_row: usize) -> Option<DeliveryNoteSegment> {
        self.close(last_row)
    }
}

// ==========================================
// NoteSegmenter - 送货单分段器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct NoteSegmenter;

impl NoteSegmenter {
    pub fn new() -> Self {
        Self
    }

    /// 切分网格,按发现顺序返回互不重叠的送货单段
    pub fn segment(&self, grid: &Grid) -> Vec<DeliveryNoteSegment> {
        let mut cursor = SegmentCursor::new();
        let mut segments = Vec::new();

        for row in 0..grid.row_count() {
            let row_text = grid.row_text(row);
            let closed = match classify_row(&row_text) {
                Some(SentinelKind::Start) => {
                    debug!(row, text = %row_text, "找到送货单起始行");
                    cursor.on_start(row, parse_note_info(&row_text))
                }
                Some(SentinelKind::End) => cursor.on_end(row),
                None => None,
            };
            segments.extend(closed);
        }

        if let Some(last_row) = grid.last_row() {
            segments.extend(cursor.finish(last_row));
        }

        debug!(count = segments.len(), "送货单分段完成");
        segments
    }
}

/// 使用默认分段器切分网格
pub fn segment(grid: &Grid) -> Vec<DeliveryNoteSegment> {
    NoteSegmenter::new().segment(grid)
}
