//! 规则集评估
//!
//! 针对一份输入文档评估全部活动规则，按优先级降序返回命中的规则。
//! 单条规则的条件解析失败只会跳过该规则，不影响同批次其他规则。

use crate::compiler::RuleCompiler;
use crate::error::{Result, RuleError};
use crate::executor::RuleExecutor;
use crate::models::{EvaluationContext, EvaluationResult, MatchedRule, RuleSnapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// 协作式取消标记
///
/// 评估器只在两条规则之间检查，单条规则的结果不会被部分计算。
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 规则集评估器
pub struct RuleSetEvaluator {
    executor: RuleExecutor,
    trace_enabled: bool,
}

impl RuleSetEvaluator {
    pub fn new() -> Self {
        Self {
            executor: RuleExecutor::new(),
            trace_enabled: false,
        }
    }

    /// 启用评估追踪，追踪内容以 debug 级别输出
    pub fn with_trace(mut self) -> Self {
        self.executor = RuleExecutor::new().with_trace();
        self.trace_enabled = true;
        self
    }

    /// 评估全部规则
    pub fn evaluate_all(&self, context: &EvaluationContext, rules: &[RuleSnapshot]) -> EvaluationResult {
        // 没有取消标记时不会返回错误
        self.evaluate_inner(context, rules, None)
            .unwrap_or_default()
    }

    /// 评估全部规则，每条规则之前检查取消标记
    pub fn evaluate_all_with_cancel(
        &self,
        context: &EvaluationContext,
        rules: &[RuleSnapshot],
        cancel: &CancellationFlag,
    ) -> Result<EvaluationResult> {
        self.evaluate_inner(context, rules, Some(cancel))
    }

    #[instrument(skip_all, fields(rules = rules.len()))]
    fn evaluate_inner(
        &self,
        context: &EvaluationContext,
        rules: &[RuleSnapshot],
        cancel: Option<&CancellationFlag>,
    ) -> Result<EvaluationResult> {
        let start = Instant::now();
        let mut matched_rules = Vec::new();
        let mut skipped = 0usize;

        for (evaluated, snapshot) in rules.iter().enumerate() {
            if cancel.is_some_and(CancellationFlag::is_cancelled) {
                warn!(evaluated, total = rules.len(), "评估已取消");
                return Err(RuleError::Cancelled {
                    evaluated,
                    total: rules.len(),
                });
            }

            let compiled = match RuleCompiler::compile(snapshot) {
                Ok(compiled) => compiled,
                Err(e) => {
                    warn!(rule_id = %snapshot.id, rule_name = %snapshot.name, error = %e, "跳过无法解析的规则");
                    skipped += 1;
                    continue;
                }
            };

            let outcome = self.executor.execute(&compiled, context);

            if self.trace_enabled {
                for line in &outcome.evaluation_trace {
                    debug!(rule_id = %compiled.id, "{}", line);
                }
            }

            if outcome.matched {
                matched_rules.push(MatchedRule {
                    rule_id: compiled.id,
                    rule_name: compiled.name,
                    priority: compiled.priority,
                    matched_conditions: outcome.matched_conditions,
                });
            }
        }

        // 稳定排序：同优先级保持输入顺序
        matched_rules.sort_by(|a, b| b.priority.cmp(&a.priority));

        metrics::counter!("rule_engine_evaluations_total").increment(1);
        metrics::counter!("rule_engine_rules_matched_total")
            .increment(matched_rules.len() as u64);
        metrics::counter!("rule_engine_rules_skipped_total").increment(skipped as u64);
        metrics::histogram!("rule_engine_evaluation_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        debug!(
            matched = matched_rules.len(),
            skipped,
            elapsed_us = start.elapsed().as_micros() as u64,
            "规则集评估完成"
        );

        Ok(EvaluationResult { matched_rules })
    }
}

impl Default for RuleSetEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
