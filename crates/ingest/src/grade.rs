use rust_decimal::Decimal;
use serde_json::Value;
use sigpool_core::signal::entity::{Grade, numeric_value};

const Q1_MIN: Decimal = Decimal::from_parts(7, 0, 0, false, 0);
const Q2_MIN: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
const Q3_MIN: Decimal = Decimal::from_parts(3, 0, 0, false, 0);

/// # Summary
/// 按预期收益率为信号分级。
///
/// # Logic
/// 1. 经 `numeric_value` 转为 `Decimal`：数字直接取值，字符串去空白后解析。
/// 2. 无法转换（缺失、`null`、非数字文本、布尔、数组、对象、超出 `Decimal` 范围）返回 `NA`。
/// 3. 自高到低依次比较阈值，下界包含：`>=7` Q1，`>=5` Q2，`>=3` Q3，其余 Q4。
///
/// # Arguments
/// * `profit`: 原始收益率字段。
///
/// # Returns
/// 总是返回一个等级，不会失败。
pub fn classify(profit: Option<&Value>) -> Grade {
    profit
        .and_then(numeric_value)
        .map_or(Grade::NA, grade_for)
}

/// 数值分档。
pub fn grade_for(profit: Decimal) -> Grade {
    if profit >= Q1_MIN {
        Grade::Q1
    } else if profit >= Q2_MIN {
        Grade::Q2
    } else if profit >= Q3_MIN {
        Grade::Q3
    } else {
        Grade::Q4
    }
}
