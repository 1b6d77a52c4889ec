use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use sigpool_core::common::SourceTag;
use sigpool_core::common::time::{DEFAULT_CAPTURE_OFFSET_SECS, FakeClockProvider};
use sigpool_core::feed::error::FeedError;
use sigpool_core::feed::port::FeedProvider;
use sigpool_core::signal::entity::{Grade, SourceDescriptor};
use sigpool_core::store::error::StoreError;
use sigpool_ingest::{CycleRunner, IngestCycle, IngestError, Normalizer};
use sigpool_store::memory::MemorySignalStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone)]
enum Reply {
    Json(Value),
    Timeout,
    Status(u16),
    Malformed(&'static str),
}

/// 按 URL 返回预设响应，并记录请求顺序。
#[derive(Default)]
struct MockFeed {
    replies: HashMap<String, Reply>,
    requested: Mutex<Vec<String>>,
}

impl MockFeed {
    fn with(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FeedProvider for MockFeed {
    async fn fetch_json(&self, url: &str, timeout: Duration) -> Result<Value, FeedError> {
        if let Ok(mut log) = self.requested.lock() {
            log.push(url.to_string());
        }
        match self.replies.get(url).cloned() {
            Some(Reply::Json(v)) => Ok(v),
            Some(Reply::Timeout) => Err(FeedError::Timeout(timeout)),
            Some(Reply::Status(code)) => Err(FeedError::HttpStatus(code)),
            Some(Reply::Malformed(body)) => Err(FeedError::MalformedJson(body.to_string())),
            None => Err(FeedError::Connection(format!("connection refused: {}", url))),
        }
    }
}

const INTERNAL: &str = "http://upstream:5005/Internal/arbitrage";
const G1: &str = "http://upstream:8888/g1/signals";
const COMPUTATIONAL: &str = "http://upstream:8889/computational/signals";

fn sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new(INTERNAL, SourceTag::Internal),
        SourceDescriptor::new(G1, SourceTag::G1),
        SourceDescriptor::new(COMPUTATIONAL, SourceTag::Computational),
    ]
}

fn normalizer() -> Normalizer {
    let clock = FakeClockProvider::new(Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap());
    Normalizer::new(Arc::new(clock), DEFAULT_CAPTURE_OFFSET_SECS)
}

fn internal_payload() -> Value {
    json!({
        "opportunities": [
            {"asset_name": "BTCUSDT", "strategy_name": "Internal", "pair": "USDT",
             "exchange_name": "Wallex", "entry_price": 6500000000u64,
             "exit_price": 6600000000u64, "expected_profit_percentage": 1.5},
            {"asset_name": "ETH", "strategy_name": "Internal",
             "expected_profit_percentage": "3.0"}
        ]
    })
}

fn g1_payload() -> Value {
    json!({
        "opportunities": [
            {"asset_name": "SOLUSDT", "pair": "TMN", "take_profit_price": 210.5,
             "net_profit_percent": 8.1}
        ]
    })
}

fn computational_payload() -> Value {
    json!({
        "opportunities": [
            {"asset_name": "DOGE", "strategy_name": "Computiational",
             "net_profit_percent": 5.2},
            {"asset_name": "ADA", "strategy_name": "Momentum", "pair": "USDT"},
            {"asset_name": "XRP", "strategy_name": "Momentum"}
        ]
    })
}

fn cycle(feed: Arc<MockFeed>, store: MemorySignalStore) -> IngestCycle {
    IngestCycle::new(sources(), feed, Arc::new(store), normalizer())
}

#[tokio::test]
async fn test_clean_cycle_inserts_every_source() {
    let feed = Arc::new(
        MockFeed::default()
            .with(INTERNAL, Reply::Json(internal_payload()))
            .with(G1, Reply::Json(g1_payload()))
            .with(COMPUTATIONAL, Reply::Json(computational_payload())),
    );
    let store = MemorySignalStore::new();

    let summary = cycle(feed.clone(), store.clone()).run_once().await.unwrap();

    assert!(summary.is_clean());
    assert_eq!(summary.inserted, 6);
    assert_eq!(summary.sources_polled, 3);
    assert_eq!(feed.requested(), vec![INTERNAL, G1, COMPUTATIONAL]);

    // 每个源一个批次，按配置顺序
    let batches = store.batches().await;
    assert_eq!(batches.len(), 3);

    let btc = &batches[0][0];
    assert_eq!(btc.pair, "TMN");
    assert_eq!(btc.coin.as_deref(), Some("BTCUSDT"));
    assert_eq!(btc.grade, Grade::Q4);
    assert_eq!(btc.exchange.as_deref(), Some("Wallex"));
    assert_eq!(batches[0][1].grade, Grade::Q3);

    let sol = &batches[1][0];
    assert_eq!(sol.pair, "USDT");
    assert_eq!(sol.coin.as_deref(), Some("SOL"));
    assert_eq!(sol.grade, Grade::Q1);

    let pairs: Vec<&str> = batches[2].iter().map(|s| s.pair.as_str()).collect();
    assert_eq!(pairs, vec!["TMN", "USDT", "TMN"]);
    assert_eq!(batches[2][0].grade, Grade::Q2);
    assert_eq!(batches[2][1].grade, Grade::NA);

    // 每周期一个新会话，结束即关闭
    assert_eq!(store.session_counts().await, (1, 1));
}

#[tokio::test]
async fn test_transport_error_is_isolated_to_its_source() {
    let feed = Arc::new(
        MockFeed::default()
            .with(INTERNAL, Reply::Json(internal_payload()))
            .with(G1, Reply::Timeout)
            .with(COMPUTATIONAL, Reply::Json(computational_payload())),
    );
    let store = MemorySignalStore::new();

    let summary = cycle(feed, store.clone()).run_once().await.unwrap();

    assert_eq!(summary.inserted, 5);
    assert_eq!(summary.failures.len(), 1);
    let failure = &summary.failures[0];
    assert_eq!(failure.tag, SourceTag::G1);
    assert_eq!(failure.url, G1);
    assert!(matches!(
        failure.error,
        IngestError::Transport(FeedError::Timeout(_))
    ));
    assert_eq!(store.records().await.len(), 5);
}

#[tokio::test]
async fn test_every_source_failing_still_completes_cycle() {
    let feed = Arc::new(
        MockFeed::default()
            .with(INTERNAL, Reply::Status(503))
            .with(G1, Reply::Malformed("<html>502 Bad Gateway</html>")),
    );
    let store = MemorySignalStore::new();

    let summary = cycle(feed, store.clone()).run_once().await.unwrap();

    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.sources_polled, 3);
    assert_eq!(summary.failures.len(), 3);
    assert!(matches!(
        summary.failures[0].error,
        IngestError::Transport(FeedError::HttpStatus(503))
    ));
    assert!(matches!(
        summary.failures[1].error,
        IngestError::MalformedResponse(_)
    ));
    assert!(matches!(
        summary.failures[2].error,
        IngestError::Transport(FeedError::Connection(_))
    ));
    assert_eq!(store.session_counts().await, (1, 1));
}

#[tokio::test]
async fn test_missing_or_empty_list_is_not_a_failure() {
    let feed = Arc::new(
        MockFeed::default()
            .with(INTERNAL, Reply::Json(json!({"opportunities": []})))
            .with(G1, Reply::Json(json!({"status": "ok"})))
            .with(COMPUTATIONAL, Reply::Json(json!({"opportunities": "none"}))),
    );
    let store = MemorySignalStore::new();

    let summary = cycle(feed, store.clone()).run_once().await.unwrap();

    assert!(summary.is_clean());
    assert_eq!(summary.inserted, 0);
    assert!(store.batches().await.is_empty());
}

#[tokio::test]
async fn test_top_level_array_counts_as_no_signals() {
    let feed = Arc::new(
        MockFeed::default()
            .with(INTERNAL, Reply::Json(json!([{"asset_name": "BTC"}])))
            .with(G1, Reply::Json(g1_payload()))
            .with(COMPUTATIONAL, Reply::Json(Value::Null)),
    );
    let summary = cycle(feed, MemorySignalStore::new()).run_once().await.unwrap();
    assert!(summary.is_clean());
    assert_eq!(summary.inserted, 1);
}

#[tokio::test]
async fn test_malformed_entry_aborts_only_that_source_batch() {
    let feed = Arc::new(
        MockFeed::default()
            .with(
                INTERNAL,
                Reply::Json(json!({
                    "opportunities": [
                        {"asset_name": "BTC", "strategy_name": "Internal"},
                        "garbage entry",
                        {"asset_name": "ETH"}
                    ]
                })),
            )
            .with(G1, Reply::Json(g1_payload()))
            .with(
                COMPUTATIONAL,
                Reply::Json(json!({
                    "opportunities": [{"asset_name": "DOGE", "exchange_name": ["a", "b"]}]
                })),
            ),
    );
    let store = MemorySignalStore::new();

    let summary = cycle(feed, store.clone()).run_once().await.unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.failures.len(), 2);
    assert_eq!(summary.failures[0].tag, SourceTag::Internal);
    assert_eq!(summary.failures[1].tag, SourceTag::Computational);
    assert!(summary
        .failures
        .iter()
        .all(|f| matches!(f.error, IngestError::FieldExtraction(_))));

    // Internal 源的合法条目也不应落库
    let records = store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].coin.as_deref(), Some("SOL"));
}

#[tokio::test]
async fn test_sink_rejection_drops_only_that_batch() {
    let feed = Arc::new(
        MockFeed::default()
            .with(INTERNAL, Reply::Json(internal_payload()))
            .with(G1, Reply::Json(g1_payload()))
            .with(COMPUTATIONAL, Reply::Json(computational_payload())),
    );
    let store = MemorySignalStore::rejecting(|s| s.coin.as_deref() == Some("ETH"));

    let summary = cycle(feed, store.clone()).run_once().await.unwrap();

    assert_eq!(summary.inserted, 4);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].tag, SourceTag::Internal);
    assert!(matches!(
        summary.failures[0].error,
        IngestError::Sink(StoreError::Rejected(_))
    ));
    // BTC 与 ETH 同批，整批丢弃
    let coins: Vec<Option<String>> = store.records().await.into_iter().map(|s| s.coin).collect();
    assert!(!coins.contains(&Some("BTCUSDT".to_string())));
}

#[tokio::test]
async fn test_unavailable_store_fails_whole_cycle() {
    let feed = Arc::new(MockFeed::default().with(G1, Reply::Json(g1_payload())));

    let result = cycle(feed.clone(), MemorySignalStore::unavailable())
        .run_once()
        .await;

    assert!(matches!(result, Err(IngestError::Sink(StoreError::Connection(_)))));
    assert!(feed.requested().is_empty());
}

#[tokio::test]
async fn test_shutdown_skips_remaining_sources() {
    let feed = Arc::new(
        MockFeed::default()
            .with(INTERNAL, Reply::Json(internal_payload()))
            .with(G1, Reply::Json(g1_payload())),
    );
    let store = MemorySignalStore::new();
    let (tx, rx) = watch::channel(true);

    let summary = cycle(feed.clone(), store.clone())
        .with_shutdown(rx)
        .run_once()
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.sources_polled, 0);
    assert!(feed.requested().is_empty());
    // 会话仍被关闭
    assert_eq!(store.session_counts().await, (1, 1));
    drop(tx);
}
