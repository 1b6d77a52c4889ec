//! 上游原始记录的字段名。

pub const OPPORTUNITIES: &str = "opportunities";

pub const ASSET_NAME: &str = "asset_name";
pub const PAIR: &str = "pair";
pub const STRATEGY_NAME: &str = "strategy_name";
pub const EXCHANGE_NAME: &str = "exchange_name";
pub const ENTRY_PRICE: &str = "entry_price";

/// 目标价的候选键，按优先级排列
pub const TARGET_PRICE: [&str; 2] = ["exit_price", "take_profit_price"];

/// 预期收益率的候选键，按优先级排列
pub const PROFIT: [&str; 2] = ["expected_profit_percentage", "net_profit_percent"];
