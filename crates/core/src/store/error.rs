use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理连接建立、写入与提交失败等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 无法建立会话（文件不可写、数据库不可达等）
    #[error("Connection error: {0}")]
    Connection(String),
    /// 数据库操作失败
    #[error("Database error: {0}")]
    Database(String),
    /// 批次被存储拒绝，整批未提交
    #[error("Batch rejected: {0}")]
    Rejected(String),
}
