// ==========================================
// 送货单解析系统 - 商品记录仓储
// ==========================================
// 职责: delivery_record 表的写入与查询
// 红线: Repository 不含业务逻辑
// 事务: 每张送货单一个事务,单张失败不影响已提交的送货单
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::delivery::{DeliveryRecord, NoteInfo, ProductRecord, UNKNOWN_UNIT};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, Row, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// RecordStore Trait
// ==========================================
// 用途: 送货单落库与全量读取
// 实现者: SqliteDeliveryRecordRepository（使用 rusqlite）
pub trait RecordStore: Send + Sync {
    /// 保存一张送货单的全部商品（全部成功或全部回滚）
    ///
    /// # 返回
    /// - Ok(usize): 写入的商品记录数
    /// - Err: 数据库错误（本张送货单整体回滚）
    fn save_note(
        &self,
        file_name: &str,
        info: &NoteInfo,
        products: &[ProductRecord],
    ) -> RepositoryResult<usize>;

    /// 读取全部记录（按 id 升序）
    fn all_records(&self) -> RepositoryResult<Vec<DeliveryRecord>>;

    /// 记录总数
    fn count_records(&self) -> RepositoryResult<i64>;
}

// ==========================================
// SqliteDeliveryRecordRepository
// ==========================================
pub struct SqliteDeliveryRecordRepository {
    conn: Arc<Mutex<Connection>>,
    unknown_unit: String,
}

impl SqliteDeliveryRecordRepository {
    /// 打开（或创建）数据库文件并建表
    pub fn new<P: AsRef<Path>>(db_path: P) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建仓储实例（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            unknown_unit: UNKNOWN_UNIT.to_string(),
        }
    }

    /// 设置单位缺失时的占位值
    pub fn with_unknown_unit(mut self, unknown_unit: impl Into<String>) -> Self {
        self.unknown_unit = unknown_unit.into();
        self
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中批量插入商品记录
    fn insert_products_tx(
        tx: &Transaction,
        file_name: &str,
        delivery_date: NaiveDate,
        ordering_unit: &str,
        delivery_unit: &str,
        products: &[ProductRecord],
    ) -> RepositoryResult<usize> {
        let now = Local::now().naive_local().format(DATETIME_FORMAT).to_string();
        let date = delivery_date.format(DATE_FORMAT).to_string();

        let mut stmt = tx.prepare(
            r#"
            INSERT INTO delivery_record (
                file_name, delivery_date, ordering_unit, delivery_unit,
                serial_number, product_name, specification, quantity, unit,
                supplier_price, discount_rate, settlement_price, amount,
                created_time, updated_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )?;

        let mut count = 0;
        for product in products {
            stmt.execute(params![
                file_name,
                date,
                ordering_unit,
                delivery_unit,
                product.serial_number,
                product.product_name,
                product.specification,
                product.quantity.to_string(),
                product.unit,
                product.supplier_price.to_string(),
                product.discount_rate.to_string(),
                product.settlement_price.to_string(),
                product.amount.to_string(),
                now,
                now,
            ])?;
            count += 1;
        }

        Ok(count)
    }
}

impl RecordStore for SqliteDeliveryRecordRepository {
    fn save_note(
        &self,
        file_name: &str,
        info: &NoteInfo,
        products: &[ProductRecord],
    ) -> RepositoryResult<usize> {
        let delivery_date = info
            .delivery_date
            .unwrap_or_else(|| Local::now().date_naive());

        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let count = Self::insert_products_tx(
            &tx,
            file_name,
            delivery_date,
            info.order_unit_or(&self.unknown_unit),
            info.delivery_unit_or(&self.unknown_unit),
            products,
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(file_name, count, "送货单已保存到数据库");
        Ok(count)
    }

    fn all_records(&self) -> RepositoryResult<Vec<DeliveryRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                id, file_name, delivery_date, ordering_unit, delivery_unit,
                serial_number, product_name, specification, quantity, unit,
                supplier_price, discount_rate, settlement_price, amount,
                created_time, updated_time
            FROM delivery_record
            ORDER BY id
            "#,
        )?;

        let raw_rows = stmt
            .query_map([], RawRecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        raw_rows.into_iter().map(RawRecordRow::into_record).collect()
    }

    fn count_records(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM delivery_record", [], |row| row.get(0))?;
        Ok(count)
    }
}

// ==========================================
// 行解码
// ==========================================
// 先按文本读出,再在 rusqlite 闭包之外做十进制/日期解析
struct RawRecordRow {
    id: i64,
    file_name: String,
    delivery_date: String,
    ordering_unit: String,
    delivery_unit: String,
    serial_number: i64,
    product_name: String,
    specification: Option<String>,
    quantity: String,
    unit: String,
    supplier_price: String,
    discount_rate: String,
    settlement_price: String,
    amount: String,
    created_time: String,
    updated_time: String,
}

impl RawRecordRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            file_name: row.get(1)?,
            delivery_date: row.get(2)?,
            ordering_unit: row.get(3)?,
            delivery_unit: row.get(4)?,
            serial_number: row.get(5)?,
            product_name: row.get(6)?,
            specification: row.get(7)?,
            quantity: row.get(8)?,
            unit: row.get(9)?,
            supplier_price: row.get(10)?,
            discount_rate: row.get(11)?,
            settlement_price: row.get(12)?,
            amount: row.get(13)?,
            created_time: row.get(14)?,
            updated_time: row.get(15)?,
        })
    }

    fn into_record(self) -> RepositoryResult<DeliveryRecord> {
        Ok(DeliveryRecord {
            id: self.id,
            delivery_date: parse_date("delivery_date", &self.delivery_date)?,
            quantity: parse_decimal("quantity", &self.quantity)?,
            supplier_price: parse_decimal("supplier_price", &self.supplier_price)?,
            discount_rate: parse_decimal("discount_rate", &self.discount_rate)?,
            settlement_price: parse_decimal("settlement_price", &self.settlement_price)?,
            amount: parse_decimal("amount", &self.amount)?,
            created_time: parse_datetime("created_time", &self.created_time)?,
            updated_time: parse_datetime("updated_time", &self.updated_time)?,
            file_name: self.file_name,
            ordering_unit: self.ordering_unit,
            delivery_unit: self.delivery_unit,
            serial_number: self.serial_number,
            product_name: self.product_name,
            specification: self.specification,
            unit: self.unit,
        })
    }
}

fn field_error(field: &str, raw: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("{:?}: {}", raw, err),
    }
}

fn parse_decimal(field: &str, raw: &str) -> RepositoryResult<Decimal> {
    Decimal::from_str(raw).map_err(|e| field_error(field, raw, e))
}

fn parse_date(field: &str, raw: &str) -> RepositoryResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| field_error(field, raw, e))
}

fn parse_datetime(field: &str, raw: &str) -> RepositoryResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|e| field_error(field, raw, e))
}
