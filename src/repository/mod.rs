// ==========================================
// 送货单解析系统 - 数据仓储层
// ==========================================
// 职责: 数据访问,不含业务逻辑
// ==========================================

pub mod delivery_record_repo;
pub mod error;

pub use delivery_record_repo::{RecordStore, SqliteDeliveryRecordRepository};
pub use error::{RepositoryError, RepositoryResult};
