use serde_json::json;
use sigpool_core::feed::port::FeedProvider;
use sigpool_feed::http::HttpJsonFeed;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const BODY: &str = r#"{"opportunities":[{"asset_name":"ETHUSDT","net_profit_percent":5.5}]}"#;

/// # Summary
/// 启动一个统计 TCP 建连次数的上游服务。
///
/// # Logic
/// 1. 绑定 127.0.0.1 随机端口。
/// 2. 每接受一个连接计数加一。
/// 3. 连接上的每个请求都以 keep-alive 响应，客户端可以复用该连接。
async fn spawn_counting_upstream() -> anyhow::Result<(SocketAddr, Arc<AtomicUsize>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(serve_keep_alive(stream));
        }
    });

    Ok((addr, accepted))
}

async fn serve_keep_alive(mut stream: TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        while let Some(end) = header_end(&buf) {
            buf.drain(..end);
            let resp = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n{}",
                BODY.len(),
                BODY
            );
            if stream.write_all(resp.as_bytes()).await.is_err() {
                return;
            }
        }
    }
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

#[tokio::test]
async fn test_each_fetch_opens_a_fresh_connection() -> anyhow::Result<()> {
    let (addr, accepted) = spawn_counting_upstream().await?;
    let feed = HttpJsonFeed::new()?;
    let url = format!("http://{}/g1/signals", addr);

    let first = feed.fetch_json(&url, Duration::from_secs(2)).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let second = feed.fetch_json(&url, Duration::from_secs(2)).await?;

    assert_eq!(first, second);
    assert_eq!(first["opportunities"][0]["asset_name"], json!("ETHUSDT"));
    // 两个周期各自建连，不复用上一周期的空闲连接
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
    Ok(())
}
