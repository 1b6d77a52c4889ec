use super::error::StoreError;
use crate::signal::entity::CanonicalSignal;
use async_trait::async_trait;

/// # Summary
/// 信号存储接口，负责为每个采集周期开启独立会话。
///
/// # Invariants
/// - 每次 `open` 都必须返回全新的会话，周期之间不共享连接。
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// # Summary
    /// 开启一个写入会话。
    ///
    /// # Logic
    /// 1. 建立到底层存储的新连接。
    /// 2. 确保目标表结构存在。
    ///
    /// # Returns
    /// 成功返回会话，失败返回 `StoreError::Connection`。
    async fn open(&self) -> Result<Box<dyn SignalSink>, StoreError>;
}

/// # Summary
/// 单个周期内的写入会话。
///
/// # Invariants
/// - `insert_batch` 是原子的：要么整批提交，要么整批丢弃。
/// - 不保证幂等，重复写入同一逻辑信号是允许的。
#[async_trait]
pub trait SignalSink: Send {
    /// # Summary
    /// 批量写入信号。
    ///
    /// # Logic
    /// 1. 开启事务。
    /// 2. 逐条插入记录。
    /// 3. 提交事务；任一步失败则回滚。
    ///
    /// # Arguments
    /// * `records`: 同一数据源在本周期内产出的全部信号。
    ///
    /// # Returns
    /// 成功返回写入条数。
    async fn insert_batch(&mut self, records: &[CanonicalSignal]) -> Result<usize, StoreError>;

    /// 释放会话占用的连接。
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
