// ==========================================
// 送货单解析系统 - 导入服务接口
// ==========================================
// 职责: 批次校验、上传文件落盘、逐个文件导入、源文件管理、价格核查
// 说明: HTTP 路由不在本层; 本层只暴露异步方法供外层调用
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::AppConfig;
use crate::domain::delivery::InconsistencyReport;
use crate::importer::{DeliveryNoteImporter, FileProcessResult};
use crate::repository::{RecordStore, SqliteDeliveryRecordRepository};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

/// 允许上传的扩展名
pub const ALLOWED_EXTENSIONS: &[&str] = &["xls", "xlsx"];

/// 上传文件（文件名 + 内容）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// 批量导入响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImportResponse {
    /// 处理结果说明
    pub message: String,
    /// 本批次文件名（按提交顺序）
    pub files: Vec<String>,
    /// 每个文件的处理结果（与 files 顺序一致）
    pub process_results: Vec<FileProcessResult>,
}

impl BatchImportResponse {
    fn from_results(process_results: Vec<FileProcessResult>) -> Self {
        let saved = process_results.iter().filter(|r| r.saved_to_db).count();
        let failed = process_results.len() - saved;
        Self {
            message: format!("处理完成: {} 个文件已保存到数据库, {} 个文件未保存", saved, failed),
            files: process_results.iter().map(|r| r.file_name.clone()).collect(),
            process_results,
        }
    }
}

fn has_allowed_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// 校验单个文件名只含名称部分（不含路径分隔符或 ".."）
fn validate_plain_file_name(file_name: &str) -> ApiResult<()> {
    let trimmed = file_name.trim();
    if trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains("..")
    {
        return Err(ApiError::InvalidInput(format!("非法文件名: {:?}", file_name)));
    }
    Ok(())
}

// ==========================================
// ImportApi
// ==========================================
pub struct ImportApi<S = SqliteDeliveryRecordRepository>
where
    S: RecordStore + 'static,
{
    importer: Arc<DeliveryNoteImporter<S>>,
    upload_dir: PathBuf,
    max_batch_files: usize,
}

impl ImportApi<SqliteDeliveryRecordRepository> {
    /// 按配置打开数据库并构建服务
    pub fn from_config(config: &AppConfig) -> ApiResult<Self> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let repo = SqliteDeliveryRecordRepository::new(&config.db_path)?
            .with_unknown_unit(config.unknown_unit.clone());
        let importer = DeliveryNoteImporter::new(Arc::new(repo));

        Ok(Self::new(
            importer,
            config.upload_dir.clone(),
            config.max_batch_files,
        ))
    }
}

impl<S> ImportApi<S>
where
    S: RecordStore + 'static,
{
    pub fn new(
        importer: DeliveryNoteImporter<S>,
        upload_dir: impl Into<PathBuf>,
        max_batch_files: usize,
    ) -> Self {
        Self {
            importer: Arc::new(importer),
            upload_dir: upload_dir.into(),
            max_batch_files,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    fn check_batch_size(&self, count: usize) -> ApiResult<()> {
        if count == 0 {
            return Err(ApiError::InvalidInput("没有上传文件".to_string()));
        }
        if count > self.max_batch_files {
            return Err(ApiError::InvalidInput(format!(
                "单次最多上传{}个文件,本次{}个",
                self.max_batch_files, count
            )));
        }
        Ok(())
    }

    /// 校验上传批次: 文件数上限 + 仅接受 .xls/.xlsx
    pub fn validate_batch<N: AsRef<str>>(&self, file_names: &[N]) -> ApiResult<()> {
        self.check_batch_size(file_names.len())?;

        for name in file_names {
            let name = name.as_ref();
            validate_plain_file_name(name)?;
            if !has_allowed_extension(name) {
                return Err(ApiError::InvalidInput(format!(
                    "文件{}格式不支持,只支持 .xls 和 .xlsx 格式",
                    name
                )));
            }
        }
        Ok(())
    }

    /// 上传并处理一批文件
    ///
    /// 先整体校验,校验失败时不写入任何文件
    pub async fn upload_files(&self, files: Vec<UploadedFile>) -> ApiResult<BatchImportResponse> {
        let names: Vec<&str> = files.iter().map(|f| f.file_name.trim()).collect();
        self.validate_batch(&names)?;

        fs::create_dir_all(&self.upload_dir).await?;

        let mut saved_paths = Vec::with_capacity(files.len());
        for file in &files {
            let path = self.upload_dir.join(file.file_name.trim());
            fs::write(&path, &file.content).await?;
            info!(file = %path.display(), bytes = file.content.len(), "文件已保存");
            saved_paths.push(path);
        }

        self.process(saved_paths).await
    }

    /// 处理已在磁盘上的文件（文件格式由加载器判定）
    pub async fn import_paths(&self, paths: Vec<PathBuf>) -> ApiResult<BatchImportResponse> {
        self.check_batch_size(paths.len())?;
        self.process(paths).await
    }

    async fn process(&self, paths: Vec<PathBuf>) -> ApiResult<BatchImportResponse> {
        let importer = Arc::clone(&self.importer);
        let results = tokio::task::spawn_blocking(move || importer.import_files(&paths))
            .await
            .map_err(|e| ApiError::InternalError(format!("导入任务异常终止: {}", e)))?;

        let response = BatchImportResponse::from_results(results);
        info!(message = %response.message, "批次处理完成");
        Ok(response)
    }

    /// 列出上传目录中的文件（按名称排序; 目录不存在时为空）
    pub async fn list_files(&self) -> ApiResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.upload_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// 删除上传目录中的文件（已落库记录不受影响）
    pub async fn delete_file(&self, file_name: &str) -> ApiResult<()> {
        validate_plain_file_name(file_name)?;

        let path = self.upload_dir.join(file_name.trim());
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                warn!(file = %path.display(), "要删除的文件不存在");
                return Err(ApiError::NotFound(format!("文件{}不存在", file_name)));
            }
        }

        fs::remove_file(&path).await?;
        info!(file = %path.display(), "文件已删除");
        Ok(())
    }

    /// 价格不一致核查（基于全部已落库记录）
    pub async fn check_price_inconsistencies(&self) -> ApiResult<InconsistencyReport> {
        let importer = Arc::clone(&self.importer);
        let inconsistencies = tokio::task::spawn_blocking(move || -> ApiResult<_> {
            let records = importer.store().all_records()?;
            Ok(importer.engine().check_inconsistencies(&records))
        })
        .await
        .map_err(|e| ApiError::InternalError(format!("核查任务异常终止: {}", e)))??;

        Ok(InconsistencyReport::from(inconsistencies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions() {
        assert!(has_allowed_extension("0601.xlsx"));
        assert!(has_allowed_extension("0601.XLS"));
        assert!(!has_allowed_extension("0601.csv"));
        assert!(!has_allowed_extension("xlsx"));
    }

    #[test]
    fn test_plain_file_name() {
        assert!(validate_plain_file_name("送货单.xlsx").is_ok());
        assert!(validate_plain_file_name("../etc/passwd").is_err());
        assert!(validate_plain_file_name("a/b.xlsx").is_err());
        assert!(validate_plain_file_name("a\\b.xlsx").is_err());
        assert!(validate_plain_file_name("  ").is_err());
    }
}
