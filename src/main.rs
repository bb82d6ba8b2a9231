// ==========================================
// 送货单解析系统 - 命令行入口
// ==========================================
// 子命令: import / check / files / delete
// 输出: 结果以 JSON 打印到 stdout,日志输出到 stderr
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use delivery_note_extractor::api::{ImportApi, UploadedFile};
use delivery_note_extractor::config::AppConfig;
use delivery_note_extractor::logging;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "delivery-note-extractor")]
#[command(about = "送货单表格解析、入库与价格一致性核查", version)]
struct Cli {
    /// SQLite 数据库路径（覆盖 DELIVERY_NOTE_DB_PATH）
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// 上传文件存放目录（覆盖 DELIVERY_NOTE_UPLOAD_DIR）
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 上传并解析送货单文件（.xls/.xlsx）
    Import {
        /// 送货单文件
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// 原地解析,不复制到上传目录（同时接受 .csv）
        #[arg(long)]
        in_place: bool,
    },
    /// 核查同日同品的结算价是否一致
    Check,
    /// 列出上传目录中的文件
    Files,
    /// 删除上传目录中的文件
    Delete {
        /// 文件名
        name: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn read_uploads(files: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("读取文件失败: {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("无法获取文件名: {}", path.display()))?
            .to_string();
        uploads.push(UploadedFile { file_name, content });
    }
    Ok(uploads)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json_log {
        logging::init_json();
    } else {
        logging::init();
    }

    let config = AppConfig::from_env().with_overrides(cli.db, cli.upload_dir);
    info!(
        version = delivery_note_extractor::VERSION,
        db = %config.db_path.display(),
        upload_dir = %config.upload_dir.display(),
        "{}启动",
        delivery_note_extractor::APP_NAME
    );

    let api = ImportApi::from_config(&config).context("初始化服务失败")?;

    match cli.command {
        Command::Import { files, in_place } => {
            let response = if in_place {
                api.import_paths(files).await?
            } else {
                api.upload_files(read_uploads(&files).await?).await?
            };
            print_json(&response)?;
        }
        Command::Check => {
            let report = api.check_price_inconsistencies().await?;
            print_json(&report)?;
        }
        Command::Files => {
            let files = api.list_files().await?;
            print_json(&files)?;
        }
        Command::Delete { name } => {
            api.delete_file(&name).await?;
            println!("文件 {} 删除成功", name);
        }
    }

    Ok(())
}
