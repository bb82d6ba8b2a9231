// ==========================================
// 送货单解析系统 - API 层
// ==========================================
// 职责: 提供服务接口,供命令行或外层服务调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{BatchImportResponse, ImportApi, UploadedFile, ALLOWED_EXTENSIONS};
