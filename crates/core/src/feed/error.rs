use std::time::Duration;
use thiserror::Error;

/// # Summary
/// 拉取上游 JSON 时的错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - `MalformedJson` 属于响应格式问题，其余均属于传输问题。
#[derive(Error, Debug)]
pub enum FeedError {
    // 请求在超时时间内未完成
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    // 连接被拒绝或中断
    #[error("Connection error: {0}")]
    Connection(String),
    // 非 2xx 状态码
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    // 响应体不是合法 JSON，附带响应体片段
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),
    // HTTP 客户端自身的构建或请求错误
    #[error("Client error: {0}")]
    Client(String),
}
