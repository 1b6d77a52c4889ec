use thiserror::Error;

/// # Summary
/// 原始字段提取错误：字段存在但 JSON 类型不符合预期。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 缺失或为 `null` 的字段不属于错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    // 机会条目本身不是 JSON 对象
    #[error("Opportunity is not an object, got {0}")]
    NotAnObject(&'static str),
    // 字段类型不符，例如文本字段收到了数组
    #[error("Field `{field}` expected {expected}, got {found}")]
    UnexpectedType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}
