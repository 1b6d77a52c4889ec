use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use sigpool_core::common::time::{CAPTURE_TIME_FORMAT, format_capture_time};
use sigpool_core::signal::entity::{CanonicalSignal, Grade, parse_decimal};
use sigpool_core::store::error::StoreError;
use sigpool_core::store::port::{SignalSink, SignalStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 信号池表结构
const CREATE_SIGNAL_POOL: &str = r#"
    CREATE TABLE IF NOT EXISTS signal_pool (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        captured_at TEXT NOT NULL,
        captured_offset INTEGER NOT NULL,
        pair TEXT NOT NULL,
        coin TEXT,
        signal_grade TEXT NOT NULL,
        profit_percent TEXT,
        strategy_name TEXT,
        exchange TEXT,
        entry_price TEXT,
        target_price TEXT
    );
"#;

const INSERT_SIGNAL: &str = r#"
    INSERT INTO signal_pool
    (captured_at, captured_offset, pair, coin, signal_grade, profit_percent, strategy_name, exchange, entry_price, target_price)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

type SignalRow = (
    String,
    i32,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// SignalStore 的 SQLite 实现。
///
/// # Summary
/// 所有信号写入同一个 SQLite 文件中的 `signal_pool` 表。
///
/// # Invariants
/// * 不缓存连接：每次 `open` 都建立新连接，会话关闭即释放。
/// * 十进制数值以文本存储，避免浮点误差。
pub struct SqliteSignalStore {
    path: PathBuf,
    options: SqliteConnectOptions,
}

impl SqliteSignalStore {
    /// 创建新的 SqliteSignalStore 实例。
    ///
    /// # Logic
    /// 1. 确保数据库文件所在目录存在。
    /// 2. 配置 SQLite 连接选项，开启 `create_if_missing`。
    ///
    /// # Arguments
    /// * `path` - 数据库文件路径。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或错误。
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Connection(e.to_string()))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);

        Ok(Self { path, options })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 建立新连接并确保表结构存在。
    async fn connect(&self) -> Result<SqliteConnection, StoreError> {
        let mut conn = self
            .options
            .connect()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sqlx::query(CREATE_SIGNAL_POOL)
            .execute(&mut conn)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(conn)
    }

    /// # Summary
    /// 读取最新写入的信号。
    ///
    /// # Logic
    /// 1. 建立临时连接。
    /// 2. 按自增 ID 倒序取前 `limit` 条。
    /// 3. 还原采集时区与十进制字段。
    ///
    /// # Arguments
    /// * `limit` - 返回条数上限。
    ///
    /// # Returns
    /// * `Result<Vec<CanonicalSignal>, StoreError>` - 由新到旧排列。
    pub async fn recent(&self, limit: u32) -> Result<Vec<CanonicalSignal>, StoreError> {
        let mut conn = self.connect().await?;

        let rows = sqlx::query_as::<_, SignalRow>(
            r#"
            SELECT captured_at, captured_offset, pair, coin, signal_grade, profit_percent,
                   strategy_name, exchange, entry_price, target_price
            FROM signal_pool
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&mut conn)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.close()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_signal).collect()
    }
}

fn row_to_signal(r: SignalRow) -> Result<CanonicalSignal, StoreError> {
    let offset = FixedOffset::east_opt(r.1)
        .ok_or_else(|| StoreError::Database(format!("Invalid captured_offset: {}", r.1)))?;
    let naive = NaiveDateTime::parse_from_str(&r.0, CAPTURE_TIME_FORMAT)
        .map_err(|e| StoreError::Database(format!("Invalid captured_at {}: {}", r.0, e)))?;
    let captured_at = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| StoreError::Database(format!("Ambiguous captured_at: {}", r.0)))?;
    let grade = r.4.parse::<Grade>().map_err(StoreError::Database)?;

    Ok(CanonicalSignal {
        captured_at,
        pair: r.2,
        coin: r.3,
        grade,
        profit_percent: r.5.as_deref().and_then(parse_decimal),
        strategy_name: r.6,
        exchange: r.7,
        entry_price: r.8.as_deref().and_then(parse_decimal),
        target_price: r.9.as_deref().and_then(parse_decimal),
    })
}

#[async_trait]
impl SignalStore for SqliteSignalStore {
    async fn open(&self) -> Result<Box<dyn SignalSink>, StoreError> {
        let conn = self.connect().await?;
        debug!("Opened signal_pool session on {}", self.path.display());
        Ok(Box::new(SqliteSignalSink { conn }))
    }
}

/// # Summary
/// 单周期的 SQLite 写入会话，独占一个连接。
pub struct SqliteSignalSink {
    conn: SqliteConnection,
}

#[async_trait]
impl SignalSink for SqliteSignalSink {
    /// # Summary
    /// 在单个事务内写入整批信号。
    ///
    /// # Logic
    /// 1. 空批次直接返回 0。
    /// 2. 开启事务并逐条插入。
    /// 3. 任一插入失败时事务随 `tx` 析构回滚，本批无任何记录落库。
    async fn insert_batch(&mut self, records: &[CanonicalSignal]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .conn
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        for signal in records {
            sqlx::query(INSERT_SIGNAL)
                .bind(format_capture_time(&signal.captured_at))
                .bind(signal.captured_at.offset().local_minus_utc())
                .bind(&signal.pair)
                .bind(&signal.coin)
                .bind(signal.grade.as_str())
                .bind(signal.profit_percent.map(|d| d.to_string()))
                .bind(&signal.strategy_name)
                .bind(&signal.exchange)
                .bind(signal.entry_price.map(|d| d.to_string()))
                .bind(signal.target_price.map(|d| d.to_string()))
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(records.len())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.conn
            .close()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
