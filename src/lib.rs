// ==========================================
// 送货单解析系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 从非结构化送货单表格中抽取、标准化商品明细,并核查同日同品价格
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 解析规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 服务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    CellValue, DeliveryNote, DeliveryNoteSegment, DeliveryRecord, FieldTag, Grid, Inconsistency,
    InconsistencyReport, NamedGrid, NoteInfo, ProductRecord,
};

// 引擎
pub use engine::{check_inconsistencies, process_sheet, DeliveryNoteEngine};

// 导入
pub use importer::{load_sheets, normalize_discount, DeliveryNoteImporter, FileProcessResult};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "送货单解析系统";
