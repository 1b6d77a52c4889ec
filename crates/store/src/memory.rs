use async_trait::async_trait;
use sigpool_core::signal::entity::CanonicalSignal;
use sigpool_core::store::error::StoreError;
use sigpool_core::store::port::{SignalSink, SignalStore};
use std::sync::Arc;
use tokio::sync::RwLock;

type RejectFn = dyn Fn(&CanonicalSignal) -> bool + Send + Sync;

#[derive(Default)]
struct MemoryState {
    batches: Vec<Vec<CanonicalSignal>>,
    opened: usize,
    closed: usize,
}

/// # Summary
/// 基于内存的信号存储实现，用于空跑 (dry-run) 与测试。
///
/// 作为 `SignalStore` 的适配器，按批次保留已提交的信号，并统计会话的开关次数。
///
/// # Invariants
/// * 被拒绝的批次整批丢弃，与事务型存储语义一致。
#[derive(Clone, Default)]
pub struct MemorySignalStore {
    state: Arc<RwLock<MemoryState>>,
    reject: Option<Arc<RejectFn>>,
    unavailable: bool,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 批次中任一记录满足 `predicate` 时整批拒绝。
    pub fn rejecting<F>(predicate: F) -> Self
    where
        F: Fn(&CanonicalSignal) -> bool + Send + Sync + 'static,
    {
        Self {
            reject: Some(Arc::new(predicate)),
            ..Self::default()
        }
    }

    /// 模拟存储不可达：`open` 总是失败。
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// 已提交的全部信号，按写入顺序展开。
    pub async fn records(&self) -> Vec<CanonicalSignal> {
        self.state.read().await.batches.iter().flatten().cloned().collect()
    }

    /// 已提交的批次。
    pub async fn batches(&self) -> Vec<Vec<CanonicalSignal>> {
        self.state.read().await.batches.clone()
    }

    /// (已开启, 已关闭) 的会话数。
    pub async fn session_counts(&self) -> (usize, usize) {
        let guard = self.state.read().await;
        (guard.opened, guard.closed)
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn open(&self) -> Result<Box<dyn SignalSink>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Connection("memory store unavailable".to_string()));
        }
        self.state.write().await.opened += 1;
        Ok(Box::new(MemorySignalSink {
            state: self.state.clone(),
            reject: self.reject.clone(),
        }))
    }
}

struct MemorySignalSink {
    state: Arc<RwLock<MemoryState>>,
    reject: Option<Arc<RejectFn>>,
}

#[async_trait]
impl SignalSink for MemorySignalSink {
    async fn insert_batch(&mut self, records: &[CanonicalSignal]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        if let Some(reject) = &self.reject {
            if let Some(bad) = records.iter().find(|r| reject(r)) {
                return Err(StoreError::Rejected(format!(
                    "record for coin {:?} refused",
                    bad.coin
                )));
            }
        }
        self.state.write().await.batches.push(records.to_vec());
        Ok(records.len())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.state.write().await.closed += 1;
        Ok(())
    }
}
