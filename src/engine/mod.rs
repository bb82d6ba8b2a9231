// ==========================================
// 送货单解析系统 - 引擎层
// ==========================================
// 职责: 单表解析（日期/分段/明细）与价格一致性核查
// 红线: 引擎不做 IO,不拼 SQL
// ==========================================

pub mod consistency_checker;
pub mod date_resolver;
pub mod delivery_note_engine;
pub mod note_segmenter;
pub mod record_extractor;

// 重导出核心引擎
pub use consistency_checker::{find_inconsistencies, ConsistencyChecker};
pub use date_resolver::{resolve_date, DateResolver};
pub use delivery_note_engine::{check_inconsistencies, process_sheet, DeliveryNoteEngine};
pub use note_segmenter::{segment, NoteSegmenter, SegmentCursor};
pub use record_extractor::{extract, ExtractionStats, RecordExtractor};
