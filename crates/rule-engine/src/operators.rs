//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
///
/// 线上格式为 PascalCase 字符串（如 `"GreaterThan"`），大小写敏感。
/// 无法识别的标签保留在 `Unsupported` 中，序列化时原样写回，评估时恒为 false。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    // 通用比较
    Equals,
    NotEquals,

    // 字符串操作
    Contains,
    StartsWith,
    EndsWith,

    // 空值检查
    IsNull,
    IsNotNull,

    // 数值比较
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,

    // 列表包含（逗号分隔）
    In,

    Unsupported(String),
}

impl Operator {
    /// 所有受支持的操作符
    pub const SUPPORTED: [Operator; 12] = [
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
        Self::IsNull,
        Self::IsNotNull,
        Self::GreaterThan,
        Self::GreaterThanOrEquals,
        Self::LessThan,
        Self::LessThanOrEquals,
        Self::In,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "Equals",
            Self::NotEquals => "NotEquals",
            Self::Contains => "Contains",
            Self::StartsWith => "StartsWith",
            Self::EndsWith => "EndsWith",
            Self::IsNull => "IsNull",
            Self::IsNotNull => "IsNotNull",
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanOrEquals => "GreaterThanOrEquals",
            Self::LessThan => "LessThan",
            Self::LessThanOrEquals => "LessThanOrEquals",
            Self::In => "In",
            Self::Unsupported(tag) => tag,
        }
    }
}

impl From<&str> for Operator {
    fn from(tag: &str) -> Self {
        match tag {
            "Equals" => Self::Equals,
            "NotEquals" => Self::NotEquals,
            "Contains" => Self::Contains,
            "StartsWith" => Self::StartsWith,
            "EndsWith" => Self::EndsWith,
            "IsNull" => Self::IsNull,
            "IsNotNull" => Self::IsNotNull,
            "GreaterThan" => Self::GreaterThan,
            "GreaterThanOrEquals" => Self::GreaterThanOrEquals,
            "LessThan" => Self::LessThan,
            "LessThanOrEquals" => Self::LessThanOrEquals,
            "In" => Self::In,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

impl From<String> for Operator {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unsupported(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 逻辑操作符
///
/// 解析时大小写不敏感，只有 "Or" 表示 OR，其余（包括未知文本）一律按 AND 处理。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl From<&str> for LogicalOperator {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("or") {
            Self::Or
        } else {
            Self::And
        }
    }
}

impl From<String> for LogicalOperator {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<LogicalOperator> for String {
    fn from(op: LogicalOperator) -> Self {
        op.to_string()
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "And"),
            Self::Or => write!(f, "Or"),
        }
    }
}
