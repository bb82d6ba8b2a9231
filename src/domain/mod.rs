// ==========================================
// 送货单解析系统 - 领域模型层
// ==========================================
// 职责: 定义网格、送货单、商品记录等领域实体
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod delivery;
pub mod grid;

// 重导出核心类型
pub use delivery::{
    DeliveryNote, DeliveryNoteSegment, DeliveryRecord, FieldTag, Inconsistency,
    InconsistencyRecord, InconsistencyReport, NoteInfo, ProductRecord, UNKNOWN_UNIT,
};
pub use grid::{CellValue, Grid, NamedGrid};
