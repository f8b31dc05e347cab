//! 评估服务
//!
//! 组合规则源、可选的活动规则缓存和规则集评估器，对外提供单次评估入口。

use crate::cache::ActiveRuleCache;
use crate::engine::{CancellationFlag, RuleSetEvaluator};
use crate::error::{Result, RuleError};
use crate::models::{EvaluationContext, EvaluationResult, RuleSnapshot};
use crate::store::RuleSource;
use std::sync::Arc;
use tracing::{info, instrument};

/// 评估服务
pub struct EvaluationService {
    source: Arc<dyn RuleSource>,
    cache: Option<Arc<ActiveRuleCache>>,
    evaluator: RuleSetEvaluator,
}

impl EvaluationService {
    pub fn new(source: Arc<dyn RuleSource>) -> Self {
        Self {
            source,
            cache: None,
            evaluator: RuleSetEvaluator::new(),
        }
    }

    /// 通过缓存读取活动规则
    pub fn with_cache(mut self, cache: Arc<ActiveRuleCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.evaluator = RuleSetEvaluator::new().with_trace();
        self
    }

    /// 评估输入文档
    #[instrument(skip_all)]
    pub fn evaluate(&self, context: &EvaluationContext) -> Result<EvaluationResult> {
        let rules = self.active_rules()?;
        let result = self.evaluator.evaluate_all(context, &rules);

        info!(
            active_rules = rules.len(),
            matched = result.len(),
            "文档评估完成"
        );
        Ok(result)
    }

    /// 评估 JSON 文本，文档无法解析时整体失败
    pub fn evaluate_json(&self, json: &str) -> Result<EvaluationResult> {
        let context = EvaluationContext::from_json(json)
            .map_err(|e| RuleError::InvalidDocument(e.to_string()))?;
        self.evaluate(&context)
    }

    /// 可取消的评估
    #[instrument(skip_all)]
    pub fn evaluate_with_cancel(
        &self,
        context: &EvaluationContext,
        cancel: &CancellationFlag,
    ) -> Result<EvaluationResult> {
        let rules = self.active_rules()?;
        self.evaluator.evaluate_all_with_cancel(context, &rules, cancel)
    }

    fn active_rules(&self) -> Result<Arc<Vec<RuleSnapshot>>> {
        match &self.cache {
            Some(cache) => cache.get_or_load(self.source.as_ref()),
            None => Ok(Arc::new(self.source.active_rules()?)),
        }
    }
}
