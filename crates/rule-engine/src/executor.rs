//! 规则执行器
//!
//! 对条件树做短路求值，收集使规则成立的叶子条件。
//!
//! - AND 组：遇到第一个不成立的子节点立即返回 false，已收集的条件全部丢弃
//! - OR 组：遇到第一个成立的子节点立即返回 true，只保留该子节点的条件
//! - 空组：不成立

use crate::compiler::CompiledRule;
use crate::evaluator::ConditionEvaluator;
use crate::models::{Condition, ConditionGroup, ConditionNode, EvaluationContext, MatchedCondition};
use crate::operators::LogicalOperator;

/// 单个节点的求值结果
#[derive(Debug, Clone, Default)]
pub struct NodeOutcome {
    pub matched: bool,
    pub matched_conditions: Vec<MatchedCondition>,
}

impl NodeOutcome {
    fn unmatched() -> Self {
        Self::default()
    }

    fn matched(matched_conditions: Vec<MatchedCondition>) -> Self {
        Self {
            matched: true,
            matched_conditions,
        }
    }
}

/// 单条规则的执行结果
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub matched: bool,
    pub matched_conditions: Vec<MatchedCondition>,
    pub evaluation_trace: Vec<String>,
}

/// 规则执行器
pub struct RuleExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 执行规则评估
    pub fn execute(&self, rule: &CompiledRule, context: &EvaluationContext) -> ExecutionOutcome {
        let mut trace = Vec::new();
        let outcome = self.evaluate_node(rule.root(), context, &mut trace, "root");

        ExecutionOutcome {
            matched: outcome.matched,
            matched_conditions: outcome.matched_conditions,
            evaluation_trace: trace,
        }
    }

    /// 对任意条件树求值
    pub fn evaluate(&self, node: &ConditionNode, context: &EvaluationContext) -> NodeOutcome {
        let mut trace = Vec::new();
        self.evaluate_node(node, context, &mut trace, "root")
    }

    /// 递归评估规则节点
    fn evaluate_node(
        &self,
        node: &ConditionNode,
        context: &EvaluationContext,
        trace: &mut Vec<String>,
        path: &str,
    ) -> NodeOutcome {
        match node {
            ConditionNode::Leaf(cond) => self.evaluate_condition(cond, context, trace, path),
            ConditionNode::Group(group) => self.evaluate_group(group, context, trace, path),
        }
    }

    /// 评估叶子条件
    fn evaluate_condition(
        &self,
        cond: &Condition,
        context: &EvaluationContext,
        trace: &mut Vec<String>,
        path: &str,
    ) -> NodeOutcome {
        let field_value = context.resolve(&cond.field);
        let literal = cond.value.as_deref();

        let matched = ConditionEvaluator::evaluate(&cond.operator, field_value.as_deref(), literal);

        if self.trace_enabled {
            trace.push(format!(
                "{}: {} {} {:?} (actual {:?}) => {}",
                path,
                cond.field,
                cond.operator,
                literal,
                field_value,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        if !matched {
            return NodeOutcome::unmatched();
        }

        NodeOutcome::matched(vec![MatchedCondition {
            field: cond.field.clone(),
            operator: cond.operator.clone(),
            value: cond.value.clone(),
            reason: ConditionEvaluator::reason(
                &cond.field,
                &cond.operator,
                field_value.as_deref(),
                literal,
            ),
        }])
    }

    /// 子节点路径，仅在追踪开启时构造
    fn child_path(&self, path: &str, index: usize) -> String {
        if self.trace_enabled {
            format!("{}.children[{}]", path, index)
        } else {
            String::new()
        }
    }

    /// 评估逻辑组节点（短路求值）
    fn evaluate_group(
        &self,
        group: &ConditionGroup,
        context: &EvaluationContext,
        trace: &mut Vec<String>,
        path: &str,
    ) -> NodeOutcome {
        if group.children.is_empty() {
            if self.trace_enabled {
                trace.push(format!("{}: 空 {} 组视为不匹配", path, group.operator));
            }
            return NodeOutcome::unmatched();
        }

        match group.operator {
            LogicalOperator::And => {
                let mut collected = Vec::new();
                for (i, child) in group.children.iter().enumerate() {
                    let child_path = self.child_path(path, i);
                    let outcome = self.evaluate_node(child, context, trace, &child_path);

                    if !outcome.matched {
                        if self.trace_enabled {
                            trace.push(format!("{}: AND 短路 - 子节点 {} 不匹配", path, i));
                        }
                        return NodeOutcome::unmatched();
                    }
                    collected.extend(outcome.matched_conditions);
                }

                NodeOutcome::matched(collected)
            }
            LogicalOperator::Or => {
                for (i, child) in group.children.iter().enumerate() {
                    let child_path = self.child_path(path, i);
                    let outcome = self.evaluate_node(child, context, trace, &child_path);

                    if outcome.matched {
                        if self.trace_enabled {
                            trace.push(format!("{}: OR 短路 - 子节点 {} 匹配", path, i));
                        }
                        return outcome;
                    }
                }

                if self.trace_enabled {
                    trace.push(format!("{}: OR 组无匹配", path));
                }
                NodeOutcome::unmatched()
            }
        }
    }
}

impl Default for RuleExecutor {
    fn default() -> Self {
        Self::new()
    }
}
