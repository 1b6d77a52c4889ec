use crate::common::SourceTag;
use crate::signal::error::FieldError;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::time::Duration;

/// 数据源默认请求超时（秒）
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 10;

/// # Summary
/// 信号质量等级，由预期收益率分档得出。
///
/// # Invariants
/// - `Q1` 最优，`Q4` 最差；收益率无法解析时为 `NA`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Grade {
    Q1,
    Q2,
    Q3,
    Q4,
    NA,
}

impl Grade {
    /// 持久化使用的文本形式，`NA` 写作 `N/A`。
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Q1 => "Q1",
            Grade::Q2 => "Q2",
            Grade::Q3 => "Q3",
            Grade::Q4 => "Q4",
            Grade::NA => "N/A",
        }
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "Q1" => Ok(Grade::Q1),
            "Q2" => Ok(Grade::Q2),
            "Q3" => Ok(Grade::Q3),
            "Q4" => Ok(Grade::Q4),
            "N/A" | "NA" => Ok(Grade::NA),
            _ => Err(format!("Unknown Grade: {}", s)),
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Summary
/// 规范化后的交易信号，即写入存储的记录形态。
///
/// # Invariants
/// - `pair` 与 `grade` 恒有值。
/// - 构造后不再修改，交给存储后即丢弃。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalSignal {
    // 归一化时刻的墙上时间（采集时区）
    pub captured_at: DateTime<FixedOffset>,
    // 结算货币 (USDT / TMN ...)
    pub pair: String,
    // 去除结算货币后缀的币种代码
    pub coin: Option<String>,
    // 质量等级
    pub grade: Grade,
    // 预期收益率（百分比）
    pub profit_percent: Option<Decimal>,
    // 策略名
    pub strategy_name: Option<String>,
    // 交易所名
    pub exchange: Option<String>,
    // 进场价
    pub entry_price: Option<Decimal>,
    // 目标价
    pub target_price: Option<Decimal>,
}

/// # Summary
/// 数据源静态描述，进程启动时加载，之后不可变。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDescriptor {
    // 接口地址
    pub url: String,
    // 数据源身份，用于选择归一化规则
    pub tag: SourceTag,
    // 单次请求超时
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_SOURCE_TIMEOUT_SECS
}

impl SourceDescriptor {
    pub fn new(url: impl Into<String>, tag: SourceTag) -> Self {
        Self {
            url: url.into(),
            tag,
            timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// # Summary
/// 上游返回的一条原始机会记录，键集合因源而异。
///
/// # Invariants
/// - 任何键都可能缺失；值为 `null` 的键与缺失等价。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOpportunity(Map<String, Value>);

impl RawOpportunity {
    /// # Summary
    /// 从任意 JSON 值构造原始记录。
    ///
    /// # Returns
    /// 非对象输入返回 `FieldError::NotAnObject`。
    pub fn from_value(value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(FieldError::NotAnObject(json_kind(&other))),
        }
    }

    /// 读取字段，`null` 视为缺失。
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    /// # Summary
    /// 读取文本字段。
    ///
    /// # Logic
    /// 1. 缺失或 `null` 返回 `None`。
    /// 2. 字符串原样返回。
    /// 3. 其它 JSON 类型视为提取错误。
    pub fn text(&self, field: &'static str) -> Result<Option<&str>, FieldError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(FieldError::UnexpectedType {
                field,
                expected: "string",
                found: json_kind(other),
            }),
        }
    }

    /// # Summary
    /// 按顺序读取第一个非空的数值字段并转为 `Decimal`。
    ///
    /// # Logic
    /// 1. 数字与数字字符串按十进制解析（支持科学计数法）。
    /// 2. 无法解析的文本与布尔值视为缺失。
    /// 3. 数组或对象视为提取错误。
    pub fn decimal(&self, fields: &[&'static str]) -> Result<Option<Decimal>, FieldError> {
        let Some((field, value)) = fields
            .iter()
            .copied()
            .find_map(|f| self.get(f).map(|v| (f, v)))
        else {
            return Ok(None);
        };
        match value {
            Value::Array(_) | Value::Object(_) => Err(FieldError::UnexpectedType {
                field,
                expected: "number",
                found: json_kind(value),
            }),
            _ => Ok(numeric_value(value)),
        }
    }
}

impl From<Map<String, Value>> for RawOpportunity {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// # Summary
/// 所有数值字段共用的 JSON 数值转换。
///
/// # Logic
/// 1. 数字与字符串交给 `parse_decimal`。
/// 2. 其它类型返回 `None`。
///
/// # Invariants
/// - 收益率的分级与落库值都经过这里，二者不会互相矛盾。
pub fn numeric_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// 解析十进制文本，失败时返回 `None`。
///
/// 不接受数字分隔符 `_`。绝对值小于 `Decimal` 最小精度的数舍入为 0，
/// 超出 `Decimal` 表示范围的数返回 `None`。
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let t = text.trim();
    if t.contains('_') {
        return None;
    }
    Decimal::from_str(t)
        .ok()
        .or_else(|| Decimal::from_scientific(t).ok())
        .or_else(|| below_precision(t).then_some(Decimal::ZERO))
}

fn below_precision(text: &str) -> bool {
    text.parse::<f64>()
        .is_ok_and(|f| f.is_finite() && f.abs() < DECIMAL_EPSILON)
}

// Decimal 最多 28 位小数
const DECIMAL_EPSILON: f64 = 1e-28;

/// JSON 值的类型名，用于错误信息。
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
