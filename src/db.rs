// ==========================================
// 送货单解析系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表幂等（CREATE TABLE IF NOT EXISTS）
// ==========================================

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 商品记录表结构
///
/// 说明：
/// - 金额类字段以规范十进制文本存储，避免浮点误差
/// - delivery_date 为 YYYY-MM-DD；时间戳为 YYYY-MM-DD HH:MM:SS
pub const DELIVERY_RECORD_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS delivery_record (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL,
    delivery_date TEXT NOT NULL,
    ordering_unit TEXT NOT NULL,
    delivery_unit TEXT NOT NULL,
    serial_number INTEGER NOT NULL,
    product_name TEXT NOT NULL,
    specification TEXT,
    quantity TEXT NOT NULL,
    unit TEXT NOT NULL,
    supplier_price TEXT NOT NULL,
    discount_rate TEXT NOT NULL,
    settlement_price TEXT NOT NULL,
    amount TEXT NOT NULL,
    created_time TEXT NOT NULL,
    updated_time TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_delivery_record_date_product
    ON delivery_record (delivery_date, product_name);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection<P: AsRef<Path>>(db_path: P) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(DELIVERY_RECORD_SCHEMA)
}

/// 判断表是否存在
#[cfg(test)]
fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
