use crate::feed::error::FeedError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// # Summary
/// 上游 JSON 拉取接口（外部协作者）。
///
/// # Invariants
/// - 实现必须保证单次调用在 `timeout` 内返回。
/// - 实现不做重试，失败直接上报。
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// # Summary
    /// 以 GET 方式拉取并解析 JSON。
    ///
    /// # Logic
    /// 1. 发起带超时的请求。
    /// 2. 校验状态码为 2xx。
    /// 3. 将响应体解析为 JSON 值。
    ///
    /// # Arguments
    /// * `url`: 接口地址。
    /// * `timeout`: 单次请求超时。
    ///
    /// # Returns
    /// 成功返回解析后的 JSON，失败返回 `FeedError`。
    async fn fetch_json(&self, url: &str, timeout: Duration) -> Result<Value, FeedError>;
}
