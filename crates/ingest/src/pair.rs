use crate::fields::{PAIR, STRATEGY_NAME};
use crate::normalize::profile_for;
use sigpool_core::common::SourceTag;
use sigpool_core::signal::entity::RawOpportunity;
use sigpool_core::signal::error::FieldError;
use std::sync::Once;
use tracing::warn;

pub const USDT: &str = "USDT";
pub const TMN: &str = "TMN";

/// 以托曼结算的策略名。
/// 上游历史版本中 "Computational" 曾被拼作 "Computiational"，两者等价。
const TOMAN_STRATEGIES: [&str; 3] = ["Internal", "Computational", "Computiational"];

const MISSPELLED_STRATEGY: &str = "Computiational";

static MISSPELLING_SEEN: Once = Once::new();

/// # Summary
/// 推断信号的结算货币。
///
/// # Logic
/// 按数据源查表取得结算规则，首条命中即返回：
/// 1. G1 源恒为 `USDT`，忽略载荷中的 `pair`。
/// 2. 策略名为 `Internal` / `Computational`（含历史拼写）时为 `TMN`。
/// 3. 否则取载荷中的 `pair`，缺失时为 `TMN`。
///
/// # Arguments
/// * `tag`: 数据源身份。
/// * `raw`: 原始记录。
///
/// # Returns
/// 结算货币标签；文本字段类型不符时返回 `FieldError`。
pub fn infer_pair(tag: SourceTag, raw: &RawOpportunity) -> Result<String, FieldError> {
    (profile_for(tag).pair)(raw)
}

/// 源身份决定 USDT 结算。
pub(crate) fn usdt_settlement(_raw: &RawOpportunity) -> Result<String, FieldError> {
    Ok(USDT.to_string())
}

/// 先看策略名，再看载荷中的 `pair`。
pub(crate) fn strategy_settlement(raw: &RawOpportunity) -> Result<String, FieldError> {
    if let Some(strategy) = raw.text(STRATEGY_NAME)? {
        if TOMAN_STRATEGIES.contains(&strategy) {
            if strategy == MISSPELLED_STRATEGY {
                MISSPELLING_SEEN.call_once(|| {
                    warn!(
                        "Upstream strategy name `{}` looks like a typo of `Computational`; treating both as TMN",
                        MISSPELLED_STRATEGY
                    );
                });
            }
            return Ok(TMN.to_string());
        }
    }
    Ok(raw.text(PAIR)?.unwrap_or(TMN).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn raw(v: Value) -> RawOpportunity {
        RawOpportunity::from_value(v).unwrap()
    }

    #[test]
    fn test_g1_source_overrides_payload_pair() {
        assert_eq!(infer_pair(SourceTag::G1, &raw(json!({"pair": "TMN"}))).unwrap(), USDT);
        assert_eq!(
            infer_pair(SourceTag::G1, &raw(json!({"strategy_name": "Internal"}))).unwrap(),
            USDT
        );
    }

    #[test]
    fn test_toman_strategies() {
        for name in ["Internal", "Computational", "Computiational"] {
            let r = raw(json!({"strategy_name": name, "pair": "USDT"}));
            assert_eq!(infer_pair(SourceTag::Internal, &r).unwrap(), TMN, "{}", name);
            assert_eq!(infer_pair(SourceTag::Generic, &r).unwrap(), TMN, "{}", name);
        }
    }

    #[test]
    fn test_payload_pair_then_default() {
        assert_eq!(infer_pair(SourceTag::Generic, &raw(json!({"pair": "EUR"}))).unwrap(), "EUR");
        assert_eq!(infer_pair(SourceTag::Generic, &raw(json!({}))).unwrap(), TMN);
        assert_eq!(infer_pair(SourceTag::Generic, &raw(json!({"pair": null}))).unwrap(), TMN);
        assert_eq!(
            infer_pair(SourceTag::Computational, &raw(json!({"strategy_name": "Momentum", "pair": "USDT"})))
                .unwrap(),
            USDT
        );
    }

    #[test]
    fn test_strategy_match_is_exact() {
        let r = raw(json!({"strategy_name": "internal", "pair": "EUR"}));
        assert_eq!(infer_pair(SourceTag::Internal, &r).unwrap(), "EUR");
    }

    #[test]
    fn test_non_text_pair_is_error() {
        let r = raw(json!({"pair": 12}));
        assert!(infer_pair(SourceTag::Generic, &r).is_err());
        // G1 从不读取 pair 字段
        assert!(infer_pair(SourceTag::G1, &r).is_ok());
    }
}
