//! 活动规则快照缓存
//!
//! 读穿透缓存：命中时直接返回快照（一次原子 load），过期或失效后
//! 从 [`RuleSource`] 重新加载。规则的创建、更新、删除都应调用 [`ActiveRuleCache::invalidate`]。
//! 评估结果的正确性不依赖缓存是否存在。

use crate::error::Result;
use crate::models::RuleSnapshot;
use crate::store::RuleSource;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 默认缓存时间
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CachedRules {
    rules: Arc<Vec<RuleSnapshot>>,
    loaded_at: Instant,
    /// 开始加载时的失效代数
    generation: u64,
}

/// 活动规则缓存
pub struct ActiveRuleCache {
    ttl: Duration,
    current: ArcSwapOption<CachedRules>,
    /// 每次失效递增，代数落后的快照一律视为无效
    generation: AtomicU64,
    /// 并发未命中时只允许一个线程加载
    reload_lock: Mutex<()>,
}

impl ActiveRuleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 获取活动规则快照，未命中时从规则源加载
    pub fn get_or_load(&self, source: &dyn RuleSource) -> Result<Arc<Vec<RuleSnapshot>>> {
        if let Some(rules) = self.fresh() {
            return Ok(rules);
        }

        let _guard = self.reload_lock.lock();

        // 等锁期间可能已被其他线程加载
        if let Some(rules) = self.fresh() {
            return Ok(rules);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let rules = Arc::new(source.active_rules()?);

        // 发布后才发生的失效由 fresh() 的代数检查兜住
        if self.generation.load(Ordering::Acquire) == generation {
            self.current.store(Some(Arc::new(CachedRules {
                rules: rules.clone(),
                loaded_at: Instant::now(),
                generation,
            })));
            debug!(count = rules.len(), "活动规则快照已缓存");
        } else {
            debug!("加载期间缓存已失效，丢弃本次快照");
        }

        Ok(rules)
    }

    /// 使缓存失效
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if self.current.swap(None).is_some() {
            info!("活动规则缓存已失效");
        }
    }

    /// 当前是否持有未过期的快照
    pub fn is_cached(&self) -> bool {
        self.fresh().is_some()
    }

    fn fresh(&self) -> Option<Arc<Vec<RuleSnapshot>>> {
        let cached = self.current.load_full()?;
        if cached.generation == self.generation.load(Ordering::Acquire)
            && cached.loaded_at.elapsed() < self.ttl
        {
            Some(cached.rules.clone())
        } else {
            None
        }
    }
}

impl Default for ActiveRuleCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::models::ConditionNode;
    use crate::operators::Operator;
    use crate::store::MockRuleSource;
    use uuid::Uuid;

    fn snapshot(name: &str) -> RuleSnapshot {
        RuleSnapshot::parsed(
            Uuid::new_v4(),
            name,
            0,
            ConditionNode::leaf("status", Operator::Equals, "active"),
        )
    }

    #[test]
    fn test_second_read_is_served_from_cache() {
        let mut source = MockRuleSource::new();
        source
            .expect_active_rules()
            .times(1)
            .returning(|| Ok(vec![snapshot("a")]));

        let cache = ActiveRuleCache::default();
        let first = cache.get_or_load(&source).unwrap();
        let second = cache.get_or_load(&source).unwrap();

        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.is_cached());
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let mut source = MockRuleSource::new();
        source
            .expect_active_rules()
            .times(2)
            .returning(|| Ok(vec![snapshot("a")]));

        let cache = ActiveRuleCache::default();
        cache.get_or_load(&source).unwrap();
        cache.invalidate();
        assert!(!cache.is_cached());
        cache.get_or_load(&source).unwrap();
    }

    #[test]
    fn test_expired_snapshot_is_reloaded() {
        let mut source = MockRuleSource::new();
        source
            .expect_active_rules()
            .times(2)
            .returning(|| Ok(Vec::new()));

        let cache = ActiveRuleCache::new(Duration::ZERO);
        cache.get_or_load(&source).unwrap();
        cache.get_or_load(&source).unwrap();
    }

    #[test]
    fn test_invalidate_during_load_is_not_lost() {
        let cache = Arc::new(ActiveRuleCache::default());
        let mut source = MockRuleSource::new();

        // 第一次加载过程中规则发生变更
        let during_load = cache.clone();
        let calls = AtomicU64::new(0);
        source.expect_active_rules().times(2).returning(move || {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                during_load.invalidate();
                Ok(vec![snapshot("stale")])
            } else {
                Ok(vec![snapshot("fresh")])
            }
        });

        let first = cache.get_or_load(&source).unwrap();
        assert_eq!(first[0].name, "stale");
        assert!(!cache.is_cached());

        let second = cache.get_or_load(&source).unwrap();
        assert_eq!(second[0].name, "fresh");
        assert!(cache.is_cached());
    }

    #[test]
    fn test_snapshot_from_older_generation_is_rejected() {
        let mut source = MockRuleSource::new();
        source
            .expect_active_rules()
            .times(1)
            .returning(|| Ok(vec![snapshot("a")]));

        let cache = ActiveRuleCache::default();
        cache.get_or_load(&source).unwrap();

        // 模拟失效与发布交错：代数已前进但快照尚未被清除
        cache.generation.fetch_add(1, Ordering::AcqRel);
        assert!(!cache.is_cached());
    }

    #[test]
    fn test_source_error_is_not_cached() {
        let mut source = MockRuleSource::new();
        source
            .expect_active_rules()
            .times(1)
            .returning(|| Err(RuleError::SourceError("unavailable".to_string())));

        let cache = ActiveRuleCache::default();
        assert!(cache.get_or_load(&source).is_err());
        assert!(!cache.is_cached());
    }
}
