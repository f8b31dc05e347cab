//! 规则评估命令行
//!
//! ```text
//! rule-forge [RULES_JSON] [DOCUMENT_JSON | -]
//! ```
//!
//! 规则文件为规则记录的 JSON 数组，未指定时读取配置项 `engine.rules_path`；
//! 文档未指定或为 `-` 时从标准输入读取。结果以 JSON 输出到标准输出。

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rule_engine::{
    ActiveRuleCache, CancellationFlag, EvaluationContext, EvaluationService, InMemoryRuleStore,
    Rule,
};
use ruleforge_shared::config::AppConfig;
use ruleforge_shared::observability;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::signal;
use tracing::{info, warn};
use uuid::Uuid;

/// 规则文件中的一条记录
///
/// `conditions` 既可以是序列化后的字符串，也可以直接写成 JSON 对象。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleFileEntry {
    #[serde(default)]
    id: Option<Uuid>,
    name: String,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    priority: i32,
    conditions: Value,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl From<RuleFileEntry> for Rule {
    fn from(entry: RuleFileEntry) -> Self {
        let conditions = match entry.conditions {
            Value::String(raw) => raw,
            other => other.to_string(),
        };

        Rule {
            id: entry.id.unwrap_or_else(Uuid::new_v4),
            name: entry.name,
            is_active: entry.is_active,
            priority: entry.priority,
            conditions,
            created_at: entry.created_at.unwrap_or_else(Utc::now),
            updated_at: entry.updated_at,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load("rule-forge").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let _guard = observability::init(&config.observability, &config.service_name)?;

    let mut args = std::env::args().skip(1);
    let rules_path = match args.next().or_else(|| config.engine.rules_path.clone()) {
        Some(path) => path,
        None => bail!("usage: rule-forge [RULES_JSON] [DOCUMENT_JSON | -]"),
    };
    let document_path = args.next();

    let store = load_rules(&rules_path).await?;
    let document = read_document(document_path.as_deref()).await?;
    let context =
        EvaluationContext::from_json(&document).context("Input document is not valid JSON")?;

    let mut service = EvaluationService::new(Arc::new(store));
    if config.engine.cache_enabled {
        let cache = Arc::new(ActiveRuleCache::new(config.cache_ttl()));
        service = service.with_cache(cache);
    }
    if config.engine.trace_enabled {
        service = service.with_trace();
    }

    let cancel = CancellationFlag::new();
    let task_cancel = cancel.clone();
    let mut task =
        tokio::task::spawn_blocking(move || service.evaluate_with_cancel(&context, &task_cancel));

    let result = tokio::select! {
        joined = &mut task => joined.context("Evaluation task panicked")??,
        _ = shutdown_signal() => {
            cancel.cancel();
            warn!("Evaluation interrupted, waiting for the current rule to finish...");
            task.await.context("Evaluation task panicked")??
        }
    };

    info!(matched = result.len(), "Evaluation complete");
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// 从文件加载规则记录
async fn load_rules(path: &str) -> Result<InMemoryRuleStore> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read rules file '{}'", path))?;

    let entries: Vec<RuleFileEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Rules file '{}' is not a JSON array of rules", path))?;

    let store = InMemoryRuleStore::new();
    let count = store.import(entries.into_iter().map(Rule::from).collect());
    info!(path, count, "Rules loaded");

    Ok(store)
}

/// 读取输入文档
async fn read_document(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) if path != "-" => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read document '{}'", path)),
        _ => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read document from stdin")?;
            Ok(buf)
        }
    }
}

/// 中断信号处理
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling evaluation...");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling evaluation...");
        }
    }
}
