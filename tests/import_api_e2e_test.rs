// ==========================================
// 导入服务接口端到端测试
// ==========================================
// 测试目标: 批次校验 / 上传落盘 / 文件管理 / 落库失败隔离 / 价格核查
// ==========================================


use delivery_note_extractor::api::{ApiError, ImportApi, UploadedFile};
use delivery_note_extractor::config::AppConfig;
use delivery_note_extractor::domain::{DeliveryRecord, NoteInfo, ProductRecord};
use delivery_note_extractor::importer::DeliveryNoteImporter;
use delivery_note_extractor::logging;
use delivery_note_extractor::repository::{RecordStore, RepositoryError, RepositoryResult};
use std::sync::Arc;
use test_helpers::{create_test_db, fixture_path, temp_dir};

/// 总是写入失败的仓储
struct FailingStore;

impl RecordStore for FailingStore {
    fn save_note(
        &self,
        _file_name: &str,
        _info: &NoteInfo,
        _products: &[ProductRecord],
    ) -> RepositoryResult<usize> {
        Err(RepositoryError::DatabaseConnectionError("database is locked".to_string()))
    }

    fn all_records(&self) -> RepositoryResult<Vec<DeliveryRecord>> {
        Err(RepositoryError::DatabaseConnectionError("database is locked".to_string()))
    }

    fn count_records(&self) -> RepositoryResult<i64> {
        Ok(0)
    }
}

fn test_config(db_path: std::path::PathBuf, upload_dir: std::path::PathBuf) -> AppConfig {
    AppConfig {
        db_path,
        upload_dir,
        max_batch_files: 3,
        unknown_unit: "未知".to_string(),
    }
}

fn upload(name: &str, content: &[u8]) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content: content.to_vec(),
    }
}

// ==========================================
// 测试用例
// ==========================================

#[tokio::test]
async fn test_validate_batch_rules() {
    let (_db, db_path) = create_test_db().unwrap();
    let dir = temp_dir();
    let api = ImportApi::from_config(&test_config(db_path, dir.path().join("uploads"))).unwrap();

    assert!(api.validate_batch(&["a.xlsx", "b.XLS"]).is_ok());
    assert!(matches!(
        api.validate_batch(&["a.xlsx", "b.csv"]),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        api.validate_batch(&["1.xlsx", "2.xlsx", "3.xlsx", "4.xlsx"]),
        Err(ApiError::InvalidInput(_))
    ));
    let empty: [&str; 0] = [];
    assert!(matches!(api.validate_batch(&empty), Err(ApiError::InvalidInput(_))));
}

#[tokio::test]
async fn test_upload_rejected_batch_writes_nothing() {
    let (_db, db_path) = create_test_db().unwrap();
    let dir = temp_dir();
    let upload_dir = dir.path().join("uploads");
    let api = ImportApi::from_config(&test_config(db_path, upload_dir.clone())).unwrap();

    let result = api
        .upload_files(vec![upload("a.xlsx", b"x"), upload("b.txt", b"y")])
        .await;
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    assert!(!upload_dir.exists());
    assert!(api.list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_corrupt_workbook_reports_error_and_keeps_file() {
    logging::init_test();

    println!("\n=== 测试：上传损坏文件 ===");

    let (_db, db_path) = create_test_db().unwrap();
    let dir = temp_dir();
    let api = ImportApi::from_config(&test_config(db_path, dir.path().join("uploads"))).unwrap();

    let response = api
        .upload_files(vec![
            upload("broken.xlsx", b"not a workbook"),
            upload("empty.xls", b""),
        ])
        .await
        .expect("上传应成功返回");

    assert_eq!(response.files, vec!["broken.xlsx", "empty.xls"]);
    assert_eq!(response.process_results.len(), 2);
    assert!(response
        .process_results
        .iter()
        .all(|r| r.error.is_some() && !r.saved_to_db && r.delivery_notes.is_empty()));
    println!("✓ 响应: {}", response.message);

    let files = api.list_files().await.unwrap();
    assert_eq!(files, vec!["broken.xlsx", "empty.xls"]);

    api.delete_file("broken.xlsx").await.unwrap();
    assert_eq!(api.list_files().await.unwrap(), vec!["empty.xls"]);
    println!("✓ 文件管理校验通过");
}

#[tokio::test]
async fn test_delete_file_errors() {
    let (_db, db_path) = create_test_db().unwrap();
    let dir = temp_dir();
    let api = ImportApi::from_config(&test_config(db_path, dir.path().join("uploads"))).unwrap();

    assert!(matches!(
        api.delete_file("missing.xlsx").await,
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        api.delete_file("../secret.xlsx").await,
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        api.delete_file("nested/a.xlsx").await,
        Err(ApiError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_import_paths_and_check_prices() {
    logging::init_test();

    let (_db, db_path) = create_test_db().unwrap();
    let dir = temp_dir();
    let api = ImportApi::from_config(&test_config(db_path, dir.path().join("uploads"))).unwrap();

    let response = api
        .import_paths(vec![fixture_path("two_notes.csv"), fixture_path("unlabeled.csv")])
        .await
        .unwrap();
    assert!(response.process_results.iter().all(|r| r.saved_to_db));
    assert_eq!(response.process_results[0].product_count(), 4);

    let report = api.check_price_inconsistencies().await.unwrap();
    assert_eq!(report.count, 1);
    assert_eq!(report.inconsistencies[0].product_name, "苹果");
    assert_eq!(report.inconsistencies[0].price_variants.len(), 2);
}

#[tokio::test]
async fn test_store_failure_is_reported_per_note() {
    let dir = temp_dir();
    let importer = DeliveryNoteImporter::new(Arc::new(FailingStore));
    let api = ImportApi::new(importer, dir.path().join("uploads"), 10);

    let response = api
        .import_paths(vec![fixture_path("two_notes.csv")])
        .await
        .unwrap();

    let result = &response.process_results[0];
    assert_eq!(result.error, None);
    assert!(!result.saved_to_db);
    assert_eq!(result.delivery_notes.len(), 2);
    assert!(result.delivery_notes.iter().all(|n| !n.saved_to_db));

    assert!(matches!(
        api.check_price_inconsistencies().await,
        Err(ApiError::DatabaseConnectionError(_))
    ));
}
