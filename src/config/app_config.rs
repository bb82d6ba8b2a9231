// ==========================================
// 送货单解析系统 - 运行配置
// ==========================================
// 来源优先级: 命令行参数 > 环境变量 > 默认值
// 红线: 配置在构造时显式传入各组件,不使用进程级可变全局量
// ==========================================

use crate::domain::delivery::UNKNOWN_UNIT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// 环境变量键
pub mod env_keys {
    pub const DB_PATH: &str = "DELIVERY_NOTE_DB_PATH";
    pub const UPLOAD_DIR: &str = "DELIVERY_NOTE_UPLOAD_DIR";
    pub const MAX_BATCH_FILES: &str = "DELIVERY_NOTE_MAX_BATCH_FILES";
}

/// 单批次最多接受的文件数
pub const DEFAULT_MAX_BATCH_FILES: usize = 100;

/// 默认上传目录
pub const DEFAULT_UPLOAD_DIR: &str = "excelfile";

const DB_DIR_NAME: &str = "delivery-note-extractor";
const DB_FILE_NAME: &str = "delivery_notes.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub max_batch_files: usize,
    /// 订货/送货单位缺失时落库的占位值
    pub unknown_unit: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_batch_files: DEFAULT_MAX_BATCH_FILES,
            unknown_unit: UNKNOWN_UNIT.to_string(),
        }
    }
}

impl AppConfig {
    /// 从进程环境变量构建配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源构建配置（空白值视为未设置）
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(path) = get(env_keys::DB_PATH) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(dir) = get(env_keys::UPLOAD_DIR) {
            config.upload_dir = PathBuf::from(dir);
        }

        if let Some(raw) = get(env_keys::MAX_BATCH_FILES) {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.max_batch_files = n,
                _ => warn!(
                    key = env_keys::MAX_BATCH_FILES,
                    value = %raw,
                    default = DEFAULT_MAX_BATCH_FILES,
                    "批次文件数配置无效,使用默认值"
                ),
            }
        }

        config
    }

    /// 命令行参数覆盖
    pub fn with_overrides(mut self, db_path: Option<PathBuf>, upload_dir: Option<PathBuf>) -> Self {
        if let Some(path) = db_path {
            self.db_path = path;
        }
        if let Some(dir) = upload_dir {
            self.upload_dir = dir;
        }
        self
    }
}

/// 获取默认数据库路径
///
/// # 返回
/// - 用户数据目录/delivery-note-extractor/delivery_notes.db
/// - 无法获取用户数据目录时: ./delivery_notes.db
pub fn default_db_path() -> PathBuf {
    match dirs::data_dir() {
        Some(data_dir) => data_dir.join(DB_DIR_NAME).join(DB_FILE_NAME),
        None => PathBuf::from(".").join(DB_FILE_NAME),
    }
}
