use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub mod time;

/// # Summary
/// 上游信号源身份枚举，决定原始字段到规范字段的映射规则。
///
/// # Invariants
/// - 枚举是封闭的：新增数据源必须在此登记并绑定归一化规则。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    // 内部套利接口
    Internal,
    // G1 信号接口 (USDT 结算)
    G1,
    // 计算型策略接口
    Computational,
    // 其它遵循通用字段约定的接口
    Generic,
}

impl SourceTag {
    /// 配置文件与日志中使用的标签文本。
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Internal => "internal",
            SourceTag::G1 => "g1",
            SourceTag::Computational => "computational",
            SourceTag::Generic => "generic",
        }
    }
}

impl FromStr for SourceTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "internal" => Ok(SourceTag::Internal),
            "g1" => Ok(SourceTag::G1),
            "computational" => Ok(SourceTag::Computational),
            "generic" | "other" => Ok(SourceTag::Generic),
            _ => Err(format!("Unknown SourceTag: {}", s)),
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
