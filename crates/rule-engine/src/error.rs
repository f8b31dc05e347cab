//! 规则引擎错误类型

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则条件为空")]
    EmptyCondition,

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("规则未找到: {0}")]
    RuleNotFound(Uuid),

    #[error("规则源读取失败: {0}")]
    SourceError(String),

    #[error("评估已取消: 已评估 {evaluated}/{total} 条规则")]
    Cancelled { evaluated: usize, total: usize },

    #[error("无效的输入文档: {0}")]
    InvalidDocument(String),
}

impl RuleError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyCondition => "RULE_CONDITION_EMPTY",
            Self::JsonError(_) => "JSON_ERROR",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::SourceError(_) => "RULE_SOURCE_ERROR",
            Self::Cancelled { .. } => "EVALUATION_CANCELLED",
            Self::InvalidDocument(_) => "INVALID_DOCUMENT",
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
