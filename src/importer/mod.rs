// ==========================================
// 送货单解析系统 - 导入层
// ==========================================
// 职责: 表格文件读取、表头映射、字段标准化、单文件导入驱动
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

pub mod data_cleaner;
pub mod delivery_note_importer;
pub mod error;
pub mod field_mapper;
pub mod grid_loader;

// 重导出核心类型
pub use data_cleaner::normalize_discount;
pub use delivery_note_importer::{DeliveryNoteImporter, FileProcessResult, ProcessedNote};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{map_headers, ColumnMapping, HeaderMapper, HeaderRule};
pub use grid_loader::{load_sheets, CsvGridLoader, ExcelGridLoader, GridLoader, WorkbookLoader};
