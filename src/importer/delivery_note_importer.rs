// ==========================================
// 送货单解析系统 - 单文件导入驱动
// ==========================================
// 流程: 读取工作表 → 逐表解析 → 逐张送货单落库
// 错误隔离:
//   - 文件读取失败: 记入本文件结果的 error,不影响其他文件
//   - 单张送货单落库失败: 该单 saved_to_db = false,不影响同文件其他送货单
// ==========================================

use crate::domain::delivery::{NoteInfo, ProductRecord};
use crate::engine::DeliveryNoteEngine;
use crate::importer::grid_loader::{GridLoader, WorkbookLoader};
use crate::repository::RecordStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// 导入结果
// ==========================================

/// 单张送货单的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedNote {
    pub sheet_name: String,
    pub info: NoteInfo,
    pub products: Vec<ProductRecord>,
    pub saved_to_db: bool,
}

/// 单个文件的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProcessResult {
    pub file_name: String,
    pub batch_id: String,
    pub delivery_notes: Vec<ProcessedNote>,
    /// 至少一张送货单落库成功
    pub saved_to_db: bool,
    pub error: Option<String>,
}

impl FileProcessResult {
    fn new(file_name: String) -> Self {
        Self {
            file_name,
            batch_id: Uuid::new_v4().to_string(),
            delivery_notes: Vec::new(),
            saved_to_db: false,
            error: None,
        }
    }

    pub fn product_count(&self) -> usize {
        self.delivery_notes.iter().map(|n| n.products.len()).sum()
    }
}

// ==========================================
// DeliveryNoteImporter - 导入驱动
// ==========================================
pub struct DeliveryNoteImporter<S>
where
    S: RecordStore,
{
    store: Arc<S>,
    loader: Box<dyn GridLoader>,
    engine: DeliveryNoteEngine,
}

impl<S> DeliveryNoteImporter<S>
where
    S: RecordStore,
{
    /// 使用默认加载器（按扩展名选择 Excel/CSV）
    pub fn new(store: Arc<S>) -> Self {
        Self::with_loader(store, Box::new(WorkbookLoader))
    }

    pub fn with_loader(store: Arc<S>, loader: Box<dyn GridLoader>) -> Self {
        Self {
            store,
            loader,
            engine: DeliveryNoteEngine::new(),
        }
    }

    pub fn engine(&self) -> &DeliveryNoteEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 导入单个文件
    ///
    /// 从不返回 Err: 所有失败都记录在 FileProcessResult 中
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(&self, file_path: P) -> FileProcessResult {
        let start_time = Instant::now();
        let path = file_path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut result = FileProcessResult::new(file_name);
        info!(batch_id = %result.batch_id, file_name = %result.file_name, "开始处理文件");

        let sheets = match self.loader.load_sheets(path) {
            Ok(sheets) => sheets,
            Err(e) => {
                error!(error = %e, "文件读取失败");
                result.error = Some(e.to_string());
                return result;
            }
        };

        for sheet in sheets {
            info!(sheet = %sheet.sheet_name, rows = sheet.grid.row_count(), "处理工作表");
            for note in self.engine.process_sheet(&sheet.grid) {
                let saved_to_db = match self
                    .store
                    .save_note(&result.file_name, &note.info, &note.products)
                {
                    Ok(count) => {
                        info!(sheet = %sheet.sheet_name, count, "送货单保存成功");
                        true
                    }
                    Err(e) => {
                        error!(sheet = %sheet.sheet_name, error = %e, "送货单保存失败");
                        false
                    }
                };

                result.saved_to_db |= saved_to_db;
                result.delivery_notes.push(ProcessedNote {
                    sheet_name: sheet.sheet_name.clone(),
                    info: note.info,
                    products: note.products,
                    saved_to_db,
                });
            }
        }

        if result.delivery_notes.is_empty() {
            warn!("文件中未找到有效送货单");
        }

        info!(
            notes = result.delivery_notes.len(),
            products = result.product_count(),
            saved_to_db = result.saved_to_db,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "文件处理完成"
        );
        result
    }

    /// 按顺序逐个导入文件（结果与输入顺序一致）
    pub fn import_files<P: AsRef<Path>>(&self, file_paths: &[P]) -> Vec<FileProcessResult> {
        info!(count = file_paths.len(), "开始批量处理文件");
        let results: Vec<FileProcessResult> =
            file_paths.iter().map(|path| self.import_file(path)).collect();

        info!(
            total = results.len(),
            saved = results.iter().filter(|r| r.saved_to_db).count(),
            failed = results.iter().filter(|r| r.error.is_some()).count(),
            "批量处理完成"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delivery::DeliveryRecord;
    use crate::domain::grid::{Grid, NamedGrid};
    use crate::importer::error::{ImportError, ImportResult};
    use crate::repository::{RepositoryError, RepositoryResult};
    use std::sync::Mutex;

    /// 内存仓储: 保存调用记录,可指定第 N 次保存失败
    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<(String, usize)>>,
        fail_on_call: Option<usize>,
        calls: Mutex<usize>,
    }

    impl RecordStore for MemoryStore {
        fn save_note(
            &self,
            file_name: &str,
            _info: &NoteInfo,
            products: &[ProductRecord],
        ) -> RepositoryResult<usize> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if self.fail_on_call == Some(*calls) {
                return Err(RepositoryError::DatabaseQueryError("disk full".to_string()));
            }
            self.saved
                .lock()
                .unwrap()
                .push((file_name.to_string(), products.len()));
            Ok(products.len())
        }

        fn all_records(&self) -> RepositoryResult<Vec<DeliveryRecord>> {
            Ok(Vec::new())
        }

        fn count_records(&self) -> RepositoryResult<i64> {
            Ok(self.saved.lock().unwrap().iter().map(|(_, n)| *n as i64).sum())
        }
    }

    /// 固定网格加载器
    struct FixedLoader(Vec<NamedGrid>);

    impl GridLoader for FixedLoader {
        fn load_sheets(&self, _file_path: &Path) -> ImportResult<Vec<NamedGrid>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenLoader;

    impl GridLoader for BrokenLoader {
        fn load_sheets(&self, _file_path: &Path) -> ImportResult<Vec<NamedGrid>> {
            Err(ImportError::ExcelParseError("损坏的文件".to_string()))
        }
    }

    fn note_grid(order_unit: &str) -> Grid {
        Grid::from_text_rows(vec![
            vec!["送货时间：2024-06-01".to_string()],
            vec![format!("订货单位：{}", order_unit)],
            vec!["序号".to_string(), "商品名称".to_string(), "结算价".to_string()],
            vec!["1".to_string(), "苹果".to_string(), "4".to_string()],
            vec!["制单员：张三".to_string()],
        ])
    }

    fn two_sheets() -> Vec<NamedGrid> {
        vec![
            NamedGrid {
                sheet_name: "Sheet1".to_string(),
                grid: note_grid("一食堂"),
            },
            NamedGrid {
                sheet_name: "Sheet2".to_string(),
                grid: note_grid("二食堂"),
            },
        ]
    }

    #[test]
    fn test_import_file_saves_every_note() {
        let store = Arc::new(MemoryStore::default());
        let importer =
            DeliveryNoteImporter::with_loader(store.clone(), Box::new(FixedLoader(two_sheets())));

        let result = importer.import_file("/data/0601.xlsx");
        assert_eq!(result.file_name, "0601.xlsx");
        assert_eq!(result.error, None);
        assert!(result.saved_to_db);
        assert_eq!(result.delivery_notes.len(), 2);
        assert_eq!(result.delivery_notes[1].sheet_name, "Sheet2");
        assert_eq!(result.product_count(), 2);
        assert_eq!(store.count_records().unwrap(), 2);
    }

    #[test]
    fn test_save_failure_is_isolated_per_note() {
        let store = Arc::new(MemoryStore {
            fail_on_call: Some(1),
            ..MemoryStore::default()
        });
        let importer =
            DeliveryNoteImporter::with_loader(store.clone(), Box::new(FixedLoader(two_sheets())));

        let result = importer.import_file("0601.xlsx");
        assert!(!result.delivery_notes[0].saved_to_db);
        assert!(result.delivery_notes[1].saved_to_db);
        assert!(result.saved_to_db);
        assert_eq!(store.count_records().unwrap(), 1);
    }

    #[test]
    fn test_load_failure_is_reported_not_raised() {
        let importer =
            DeliveryNoteImporter::with_loader(Arc::new(MemoryStore::default()), Box::new(BrokenLoader));

        let results = importer.import_files(&["a.xlsx", "b.xlsx"]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.error.is_some() && !r.saved_to_db));
        assert_eq!(results[1].file_name, "b.xlsx");
        assert_ne!(results[0].batch_id, results[1].batch_id);
    }
}
