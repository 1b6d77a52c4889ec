use sigpool_core::feed::error::FeedError;
use sigpool_core::signal::error::FieldError;
use sigpool_core::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// 采集管线的统一错误类型。
///
/// # Invariants
/// - 前四类错误按数据源隔离，只影响当前源在本周期的批次。
/// - `SchedulerFault` 由调度循环捕获，记录后按固定间隔继续。
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Transport error: {0}")]
    Transport(FeedError),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Field extraction error: {0}")]
    FieldExtraction(#[from] FieldError),
    #[error("Sink error: {0}")]
    Sink(#[from] StoreError),
    #[error("Scheduler fault: {0}")]
    SchedulerFault(String),
}

impl From<FeedError> for IngestError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::MalformedJson(body) => IngestError::MalformedResponse(body),
            other => IngestError::Transport(other),
        }
    }
}
