use crate::fields::{ASSET_NAME, ENTRY_PRICE, EXCHANGE_NAME, PROFIT, STRATEGY_NAME, TARGET_PRICE};
use crate::grade::grade_for;
use crate::pair::{strategy_settlement, usdt_settlement};
use chrono::{DateTime, FixedOffset};
use sigpool_core::common::SourceTag;
use sigpool_core::common::time::{TimeProvider, capture_offset};
use sigpool_core::signal::entity::{CanonicalSignal, Grade, RawOpportunity};
use sigpool_core::signal::error::FieldError;
use std::sync::Arc;

/// # Summary
/// 单个数据源的字段映射规则。
///
/// # Invariants
/// - 规则是纯函数，不持有状态。
pub struct SourceProfile {
    // 币种代码清洗
    pub coin: fn(&str) -> String,
    // 结算货币推断
    pub pair: fn(&RawOpportunity) -> Result<String, FieldError>,
}

static G1_PROFILE: SourceProfile = SourceProfile {
    coin: strip_quote_suffix,
    pair: usdt_settlement,
};

static STRATEGY_PROFILE: SourceProfile = SourceProfile {
    coin: keep_symbol,
    pair: strategy_settlement,
};

/// 数据源到映射规则的查找表。新增 `SourceTag` 变体时必须在此登记。
pub fn profile_for(tag: SourceTag) -> &'static SourceProfile {
    match tag {
        SourceTag::G1 => &G1_PROFILE,
        SourceTag::Internal | SourceTag::Computational | SourceTag::Generic => &STRATEGY_PROFILE,
    }
}

/// 去掉 `USDT` 或 `TMN` 结算后缀，例如 `BTCUSDT` → `BTC`。
fn strip_quote_suffix(symbol: &str) -> String {
    symbol
        .strip_suffix("USDT")
        .or_else(|| symbol.strip_suffix("TMN"))
        .unwrap_or(symbol)
        .to_string()
}

fn keep_symbol(symbol: &str) -> String {
    symbol.to_string()
}

/// # Summary
/// 将原始记录转换为规范信号。
///
/// # Logic
/// 1. 按 `tag` 查表取得映射规则。
/// 2. 清洗币种代码，推断结算货币。
/// 3. 目标价取 `exit_price` / `take_profit_price` 中第一个非空值，收益率同理。
/// 4. 对原始收益率分级；策略名、交易所、进场价原样保留。
///
/// # Arguments
/// * `tag`: 数据源身份。
/// * `raw`: 原始记录。
/// * `captured_at`: 采集时刻（已处于目标时区）。
///
/// # Returns
/// 规范信号；字段类型不符时返回 `FieldError`。
pub fn normalize_at(
    tag: SourceTag,
    raw: &RawOpportunity,
    captured_at: DateTime<FixedOffset>,
) -> Result<CanonicalSignal, FieldError> {
    let profile = profile_for(tag);

    let coin = raw.text(ASSET_NAME)?.map(profile.coin);
    let pair = (profile.pair)(raw)?;
    // 收益率只解析一次，分级与落库值同源
    let profit_percent = raw.decimal(&PROFIT)?;
    let grade = profit_percent.map_or(Grade::NA, grade_for);

    Ok(CanonicalSignal {
        captured_at,
        pair,
        coin,
        grade,
        profit_percent,
        strategy_name: raw.text(STRATEGY_NAME)?.map(str::to_string),
        exchange: raw.text(EXCHANGE_NAME)?.map(str::to_string),
        entry_price: raw.decimal(&[ENTRY_PRICE])?,
        target_price: raw.decimal(&TARGET_PRICE)?,
    })
}

/// # Summary
/// 带时钟的归一化器，每条记录在归一化时刻取一次时间。
pub struct Normalizer {
    clock: Arc<dyn TimeProvider>,
    offset: FixedOffset,
}

impl Normalizer {
    /// # Arguments
    /// * `clock`: 时间供给器。
    /// * `utc_offset_secs`: 采集时区相对 UTC 的秒数。
    pub fn new(clock: Arc<dyn TimeProvider>, utc_offset_secs: i32) -> Self {
        Self {
            clock,
            offset: capture_offset(utc_offset_secs),
        }
    }

    pub fn normalize(
        &self,
        tag: SourceTag,
        raw: &RawOpportunity,
    ) -> Result<CanonicalSignal, FieldError> {
        let captured_at = self.clock.now().with_timezone(&self.offset);
        normalize_at(tag, raw, captured_at)
    }
}
