use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use sigpool_core::feed::error::FeedError;
use sigpool_core::feed::port::FeedProvider;
use std::time::Duration;
use tracing::debug;

/// 错误信息中保留的响应体长度上限（字符）
const BODY_SNIPPET_CHARS: usize = 200;

/// # Summary
/// 通过 HTTP 从上游信号接口拉取 JSON 文档。
///
/// # Invariants
/// - 不保留空闲连接：每次请求新建 TCP 连接，响应读完即释放，周期之间不共享任何连接。
/// - 超时按单次请求设置。
#[derive(Clone)]
pub struct HttpJsonFeed {
    // 仅复用配置（请求头、TLS），不复用连接
    client: Client,
}

impl HttpJsonFeed {
    /// # Summary
    /// 创建新的 `HttpJsonFeed`。
    ///
    /// # Logic
    /// 1. 若尚未安装，则为 rustls 安装 `ring` 加密实现。
    /// 2. 设置 JSON `Accept` 与 `User-Agent` 请求头。
    /// 3. 关闭空闲连接池后构建客户端。
    ///
    /// # Returns
    /// * 构建失败时返回 `FeedError::Client`。
    pub fn new() -> Result<Self, FeedError> {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("sigpool/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| FeedError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

/// 将 reqwest 错误归类为传输错误。
fn classify(err: reqwest::Error, timeout: Duration) -> FeedError {
    if err.is_timeout() {
        FeedError::Timeout(timeout)
    } else if err.is_connect() || err.is_request() || err.is_body() {
        FeedError::Connection(err.to_string())
    } else {
        FeedError::Client(err.to_string())
    }
}

fn snippet(body: &str) -> String {
    if body.chars().count() > BODY_SNIPPET_CHARS {
        let head: String = body.chars().take(BODY_SNIPPET_CHARS).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

#[async_trait]
impl FeedProvider for HttpJsonFeed {
    /// # Summary
    /// 拉取 `url` 并将响应体解析为 JSON。
    ///
    /// # Logic
    /// 1. 发送 GET，`timeout` 覆盖连接、响应头与响应体。
    /// 2. 非 2xx 状态返回 `FeedError::HttpStatus`。
    /// 3. 以文本读取响应体后解析；解析失败时错误中保留响应体片段。
    async fn fetch_json(&self, url: &str, timeout: Duration) -> Result<Value, FeedError> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus(status.as_u16()));
        }

        let body = resp.text().await.map_err(|e| classify(e, timeout))?;

        serde_json::from_str(&body)
            .map_err(|e| FeedError::MalformedJson(format!("{} (body: {})", e, snippet(&body))))
    }
}
