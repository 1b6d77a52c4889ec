use crate::common::time::DEFAULT_CAPTURE_OFFSET_SECS;
use crate::signal::entity::SourceDescriptor;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 全局应用配置，启动时加载一次，之后只读。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // 按处理顺序排列的数据源
    pub sources: Vec<SourceDescriptor>,
    pub scheduler: SchedulerConfig,
    pub capture: CaptureConfig,
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    // 两个周期之间的休眠时长
    pub interval_secs: u64,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval_secs: 120 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    // 采集时间戳所在时区，相对 UTC 的秒数
    pub utc_offset_secs: i32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            utc_offset_secs: DEFAULT_CAPTURE_OFFSET_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    // SQLite 数据库文件路径
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/signal_pool.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    // RUST_LOG 未设置时使用的过滤级别
    pub level: String,
    // 滚动日志目录，为空则只输出到终端
    pub dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}
