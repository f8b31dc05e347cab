//! 日志初始化
//!
//! 规则引擎的指标通过 `metrics` facade 埋点，是否安装 recorder 由宿主进程决定，
//! 这里只负责 tracing 订阅者。

pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use serde::Deserialize;

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// 日志级别（如 "info", "debug"），RUST_LOG 优先
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 是否启用 JSON 格式日志
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// 日志守卫，进程退出前保持存活
pub struct ObservabilityGuard {
    service_name: String,
    _tracing_guard: tracing::TracingGuard,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!(service = %self.service_name, "日志关闭");
    }
}

/// 安装全局日志订阅者
///
/// 同一进程只能成功调用一次，重复调用返回错误。
///
/// ```ignore
/// let _guard = ruleforge_shared::observability::init(&config.observability, "rule-forge")?;
/// ```
pub fn init(config: &ObservabilityConfig, service_name: &str) -> Result<ObservabilityGuard> {
    let tracing_guard = tracing::init(config)?;

    info!(
        service = service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "日志已初始化"
    );

    Ok(ObservabilityGuard {
        service_name: service_name.to_string(),
        _tracing_guard: tracing_guard,
    })
}
