// ==========================================
// 送货单解析系统 - 配置层
// ==========================================
// 职责: 运行配置（数据库路径/上传目录/批次上限）
// ==========================================

pub mod app_config;

pub use app_config::{default_db_path, env_keys, AppConfig, DEFAULT_MAX_BATCH_FILES};
