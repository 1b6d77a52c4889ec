use crate::error::IngestError;
use crate::fields::OPPORTUNITIES;
use crate::normalize::Normalizer;
use async_trait::async_trait;
use serde_json::Value;
use sigpool_core::common::SourceTag;
use sigpool_core::feed::port::FeedProvider;
use sigpool_core::signal::entity::{CanonicalSignal, RawOpportunity, SourceDescriptor};
use sigpool_core::signal::error::FieldError;
use sigpool_core::store::port::{SignalSink, SignalStore};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

/// # Summary
/// 单个数据源在某周期内的失败记录。
#[derive(Debug)]
pub struct SourceFailure {
    pub tag: SourceTag,
    pub url: String,
    pub error: IngestError,
}

/// # Summary
/// 一次采集周期的汇总。
///
/// # Invariants
/// - `failures` 为空表示本周期完全成功。
#[derive(Debug)]
pub struct CycleSummary {
    // 周期唯一标识，贯穿本周期日志
    pub cycle_id: Uuid,
    // 本周期写入的信号总数
    pub inserted: usize,
    // 实际轮询过的数据源数量
    pub sources_polled: usize,
    // 按源记录的失败
    pub failures: Vec<SourceFailure>,
    // 是否因中断信号提前结束
    pub interrupted: bool,
}

impl CycleSummary {
    fn new(cycle_id: Uuid) -> Self {
        Self {
            cycle_id,
            inserted: 0,
            sources_polled: 0,
            failures: Vec::new(),
            interrupted: false,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// # Summary
/// 可被调度循环驱动的采集周期。
#[async_trait]
pub trait CycleRunner: Send + Sync {
    /// # Summary
    /// 执行一次完整的 拉取-归一化-落库 过程。
    ///
    /// # Returns
    /// 按源隔离的失败记录在 `CycleSummary` 中；只有隔离边界之外的故障
    /// （例如无法开启存储会话）才返回 `Err`。
    async fn run_once(&self) -> Result<CycleSummary, IngestError>;
}

/// # Summary
/// 采集周期的默认实现。
///
/// # Invariants
/// - 数据源按配置顺序串行处理，不并发。
/// - 存储会话每周期新建，周期结束即关闭。
/// - 中断只在数据源之间检查，进行中的请求与写入不会被取消。
pub struct IngestCycle {
    sources: Arc<[SourceDescriptor]>,
    feed: Arc<dyn FeedProvider>,
    store: Arc<dyn SignalStore>,
    normalizer: Normalizer,
    shutdown: Option<watch::Receiver<bool>>,
}

impl IngestCycle {
    /// # Arguments
    /// * `sources` - 按处理顺序排列的数据源。
    /// * `feed` - JSON 拉取实现。
    /// * `store` - 信号存储实现。
    /// * `normalizer` - 归一化器。
    pub fn new(
        sources: impl Into<Arc<[SourceDescriptor]>>,
        feed: Arc<dyn FeedProvider>,
        store: Arc<dyn SignalStore>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            sources: sources.into(),
            feed,
            store,
            normalizer,
            shutdown: None,
        }
    }

    /// 挂载中断信号，值变为 `true` 后不再处理剩余数据源。
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn interrupted(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// # Summary
    /// 处理单个数据源。
    ///
    /// # Logic
    /// 1. 带超时拉取 JSON。
    /// 2. 取出 `opportunities` 列表；缺失、为空或不是列表时视为零条信号。
    /// 3. 逐条归一化；任意一条提取失败则放弃整个源的本周期批次。
    /// 4. 整批一次性写入存储。
    async fn ingest_source(
        &self,
        cycle_id: Uuid,
        source: &SourceDescriptor,
        sink: &mut dyn SignalSink,
    ) -> Result<usize, IngestError> {
        info!("[{}] Fetching data from: {}", cycle_id, source.url);
        let doc = self.feed.fetch_json(&source.url, source.timeout()).await?;

        let Some(items) = opportunities(&doc) else {
            info!(
                "[{}] No opportunities found in response from {} (list empty or missing)",
                cycle_id, source.url
            );
            return Ok(0);
        };

        let records = items
            .iter()
            .map(|item| {
                let raw = RawOpportunity::from_value(item.clone())?;
                self.normalizer.normalize(source.tag, &raw)
            })
            .collect::<Result<Vec<CanonicalSignal>, FieldError>>()?;

        let count = sink.insert_batch(&records).await?;
        info!(
            "[{}] Inserted {} signals from {} ({})",
            cycle_id, count, source.tag, source.url
        );
        Ok(count)
    }
}

/// 非空的机会列表；顶层不是对象或字段不是列表时返回 `None`。
fn opportunities(doc: &Value) -> Option<&Vec<Value>> {
    doc.get(OPPORTUNITIES)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
}

#[async_trait]
impl CycleRunner for IngestCycle {
    /// # Summary
    /// 按配置顺序轮询全部数据源。
    ///
    /// # Logic
    /// 1. 生成周期 ID 并开启存储会话；开启失败则整个周期失败。
    /// 2. 依次处理每个源，失败记录到汇总中后继续下一个源。
    /// 3. 每个源处理前检查中断信号。
    /// 4. 关闭会话并输出汇总。
    async fn run_once(&self) -> Result<CycleSummary, IngestError> {
        let cycle_id = Uuid::new_v4();
        let mut summary = CycleSummary::new(cycle_id);

        let mut sink = self.store.open().await.map_err(|e| {
            error!("[{}] Could not open signal store session: {}", cycle_id, e);
            IngestError::Sink(e)
        })?;

        for source in self.sources.iter() {
            if self.interrupted() {
                warn!(
                    "[{}] Shutdown requested, skipping remaining {} sources",
                    cycle_id,
                    self.sources.len() - summary.sources_polled
                );
                summary.interrupted = true;
                break;
            }
            summary.sources_polled += 1;

            match self.ingest_source(cycle_id, source, sink.as_mut()).await {
                Ok(count) => summary.inserted += count,
                Err(e) => {
                    error!(
                        "[{}] Error processing data from {} ({}): {}",
                        cycle_id, source.url, source.tag, e
                    );
                    summary.failures.push(SourceFailure {
                        tag: source.tag,
                        url: source.url.clone(),
                        error: e,
                    });
                }
            }
        }

        if let Err(e) = sink.close().await {
            warn!("[{}] Failed to close signal store session: {}", cycle_id, e);
        }

        info!(
            "[{}] Cycle summary: {} signals inserted, {}/{} sources polled, {} failed",
            cycle_id,
            summary.inserted,
            summary.sources_polled,
            self.sources.len(),
            summary.failures.len()
        );

        Ok(summary)
    }
}
