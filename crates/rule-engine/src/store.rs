//! 规则存储管理
//!
//! 使用 DashMap 提供线程安全的内存规则存储，支持创建、读取、更新、删除和条件过滤。
//! 条件树以序列化文本保存，与持久化存储中的形态一致。

use crate::cache::ActiveRuleCache;
use crate::compiler::RuleCompiler;
use crate::error::{Result, RuleError};
use crate::models::{NewRule, Rule, RuleSnapshot};
use chrono::Utc;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 活动规则来源
///
/// 评估服务只依赖这一读取操作，返回顺序不做要求。
#[cfg_attr(test, mockall::automock)]
pub trait RuleSource: Send + Sync {
    fn active_rules(&self) -> Result<Vec<RuleSnapshot>>;
}

/// 列表排序字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuleSortField {
    Name,
    Priority,
    #[default]
    CreatedAt,
}

/// 排序方向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// 规则列表过滤条件
///
/// 默认按创建时间倒序。
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    pub is_active: Option<bool>,
    pub min_priority: Option<i32>,
    pub max_priority: Option<i32>,
    /// 名称模糊匹配，大小写不敏感
    pub search: Option<String>,
    pub sort_by: RuleSortField,
    pub sort_dir: SortDirection,
}

impl RuleFilter {
    fn accepts(&self, rule: &Rule) -> bool {
        if self.is_active.is_some_and(|active| rule.is_active != active) {
            return false;
        }
        if self.min_priority.is_some_and(|min| rule.priority < min) {
            return false;
        }
        if self.max_priority.is_some_and(|max| rule.priority > max) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => rule
                .name
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        }
    }

    fn compare(&self, a: &Rule, b: &Rule) -> Ordering {
        let ordering = match self.sort_by {
            RuleSortField::Name => a.name.cmp(&b.name),
            RuleSortField::Priority => a.priority.cmp(&b.priority),
            RuleSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };

        match self.sort_dir {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// 规则存储
#[derive(Clone, Default)]
pub struct InMemoryRuleStore {
    rules: Arc<DashMap<Uuid, Rule>>,
    /// 变更时需要失效的活动规则缓存
    cache: Option<Arc<ActiveRuleCache>>,
}

impl InMemoryRuleStore {
    /// 创建新的规则存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 关联活动规则缓存，之后的每次变更都会使其失效
    pub fn with_cache(mut self, cache: Arc<ActiveRuleCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 获取当前存储的规则数量
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 检查存储是否为空
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 创建规则
    #[instrument(skip(self, input), fields(rule_name = %input.name))]
    pub fn create(&self, input: NewRule) -> Result<Rule> {
        let rule = Rule {
            id: Uuid::new_v4(),
            name: input.name,
            is_active: input.is_active,
            priority: input.priority,
            conditions: RuleCompiler::serialize_condition(&input.conditions)?,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.rules.insert(rule.id, rule.clone());
        self.invalidate_cache();

        info!("规则已创建: {}", rule.id);
        Ok(rule)
    }

    /// 导入已有的规则记录（保留原 id 和时间戳）
    ///
    /// 不校验条件文本，损坏的条件在评估时才会被跳过。
    #[instrument(skip(self, rules))]
    pub fn import(&self, rules: Vec<Rule>) -> usize {
        let count = rules.len();
        for rule in rules {
            if self.rules.insert(rule.id, rule).is_some() {
                warn!("导入时覆盖了已存在的规则");
            }
        }
        self.invalidate_cache();

        info!("批量导入完成: {} 条规则", count);
        count
    }

    /// 获取规则
    pub fn get(&self, id: Uuid) -> Option<Rule> {
        self.rules.get(&id).map(|r| r.clone())
    }

    /// 更新规则
    #[instrument(skip(self, input), fields(rule_id = %id))]
    pub fn update(&self, id: Uuid, input: NewRule) -> Result<Rule> {
        let conditions = RuleCompiler::serialize_condition(&input.conditions)?;

        let updated = {
            let Some(mut entry) = self.rules.get_mut(&id) else {
                warn!("更新不存在的规则: {}", id);
                return Err(RuleError::RuleNotFound(id));
            };

            entry.name = input.name;
            entry.is_active = input.is_active;
            entry.priority = input.priority;
            entry.conditions = conditions;
            entry.updated_at = Some(Utc::now());
            entry.value().clone()
        };

        self.invalidate_cache();

        info!("规则已更新: {}", id);
        Ok(updated)
    }

    /// 删除规则
    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<()> {
        if self.rules.remove(&id).is_some() {
            self.invalidate_cache();
            info!("规则已删除: {}", id);
            Ok(())
        } else {
            warn!("删除不存在的规则: {}", id);
            Err(RuleError::RuleNotFound(id))
        }
    }

    /// 按条件列出并排序规则
    pub fn list(&self, filter: &RuleFilter) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|r| filter.accepts(r.value()))
            .map(|r| r.value().clone())
            .collect();

        rules.sort_by(|a, b| filter.compare(a, b));
        rules
    }

    fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate();
        }
    }
}

impl RuleSource for InMemoryRuleStore {
    fn active_rules(&self) -> Result<Vec<RuleSnapshot>> {
        Ok(self
            .rules
            .iter()
            .filter(|r| r.is_active)
            .map(|r| RuleSnapshot::from(r.value()))
            .collect())
    }
}
