//! 规则匹配引擎
//!
//! 针对任意 JSON 文档评估全部活动规则，返回所有命中的规则及命中原因：
//! - 条件树的 JSON 格式解析和序列化
//! - 点号路径字段解析
//! - AND/OR 短路求值
//! - 按优先级稳定排序的批量评估
//! - 内存规则存储与活动规则缓存

pub mod cache;
pub mod compiler;
pub mod document;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod operators;
pub mod service;
pub mod store;

pub use cache::ActiveRuleCache;
pub use compiler::{CompiledRule, RuleCompiler};
pub use engine::{CancellationFlag, RuleSetEvaluator};
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use executor::{ExecutionOutcome, NodeOutcome, RuleExecutor};
pub use models::{
    Condition, ConditionDto, ConditionGroup, ConditionNode, EvaluationContext, EvaluationResult,
    MatchedCondition, MatchedRule, NewRule, Rule, RuleCondition, RuleSnapshot,
};
pub use operators::{LogicalOperator, Operator};
pub use service::EvaluationService;
pub use store::{InMemoryRuleStore, RuleFilter, RuleSortField, RuleSource, SortDirection};
