use config::{Config, ConfigError, Environment, File};
use sigpool_core::config::{AppConfig, LogConfig};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const DEFAULT_CONFIG_PATH: &str = "config/sigpool.toml";
pub const ENV_PREFIX: &str = "SIGPOOL";

const LOG_FILE_PREFIX: &str = "sigpool.log";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 按优先级从低到高叠加：
/// 1. 代码内默认值。
/// 2. TOML 配置文件（不存在时跳过）。
/// 3. 环境变量，例如 `SIGPOOL__SCHEDULER__INTERVAL_SECS=60`。
///
/// # Arguments
/// * `path` - 配置文件路径。
///
/// # Returns
/// 合并后的配置；文件格式错误或字段类型不符时返回 `ConfigError`。
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()
}

/// # Summary
/// 初始化全局日志。
///
/// # Logic
/// 1. `RUST_LOG` 优先，未设置时使用配置中的级别。
/// 2. 终端输出始终开启。
/// 3. 配置了日志目录时，额外按天滚动写入文件。
///
/// # Returns
/// 文件日志的后台写入句柄；必须持有到进程退出，否则尾部日志会丢失。
pub fn init_tracing(log: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    let (file_layer, guard) = match &log.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}
