//! 规则引擎领域模型

use crate::document;
use crate::operators::{LogicalOperator, Operator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 规则记录
///
/// `conditions` 保存序列化后的条件树，读取时才解析，
/// 因此单条规则的条件损坏不会影响其他规则。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub priority: i32,
    pub conditions: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 创建或更新规则时的输入
#[derive(Debug, Clone)]
pub struct NewRule {
    pub name: String,
    pub is_active: bool,
    pub priority: i32,
    pub conditions: ConditionNode,
}

impl NewRule {
    pub fn new(name: impl Into<String>, priority: i32, conditions: ConditionNode) -> Self {
        Self {
            name: name.into(),
            is_active: true,
            priority,
            conditions,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// 条件树节点（叶子条件或逻辑组）
///
/// 线上格式见 [`ConditionDto`]：`children` 非空即为逻辑组，此时叶子字段被忽略。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConditionDto", into = "ConditionDto")]
pub enum ConditionNode {
    Leaf(Condition),
    Group(ConditionGroup),
}

impl ConditionNode {
    pub fn leaf(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self::Leaf(Condition::new(field, operator, value))
    }

    pub fn and(children: Vec<ConditionNode>) -> Self {
        Self::Group(ConditionGroup::and(children))
    }

    pub fn or(children: Vec<ConditionNode>) -> Self {
        Self::Group(ConditionGroup::or(children))
    }
}

/// 叶子条件
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Option<String>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// 不带比较值的条件（IsNull / IsNotNull）
    pub fn unary(field: impl Into<String>, operator: Operator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
        }
    }
}

/// 逻辑组节点
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    pub operator: LogicalOperator,
    pub children: Vec<ConditionNode>,
}

impl ConditionGroup {
    pub fn new(operator: LogicalOperator, children: Vec<ConditionNode>) -> Self {
        Self { operator, children }
    }

    pub fn and(children: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::And, children)
    }

    pub fn or(children: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::Or, children)
    }
}

/// 条件树的线上格式
///
/// 字段名为 camelCase；为兼容历史数据，也接受 PascalCase。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionDto {
    #[serde(default, alias = "Field", skip_serializing_if = "String::is_empty")]
    pub field: String,
    #[serde(default, alias = "Operator", skip_serializing_if = "String::is_empty")]
    pub operator: String,
    #[serde(default, alias = "Value", deserialize_with = "deserialize_literal")]
    pub value: Option<String>,
    #[serde(
        default,
        alias = "LogicalOperator",
        skip_serializing_if = "Option::is_none"
    )]
    pub logical_operator: Option<String>,
    #[serde(default, alias = "Children", skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ConditionDto>>,
}

/// 比较值允许写成 JSON 标量，统一转为文本
fn deserialize_literal<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        v @ (Value::Number(_) | Value::Bool(_)) => Ok(Some(v.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "条件值必须是标量, 实际为 {}",
            other
        ))),
    }
}

impl From<ConditionDto> for ConditionNode {
    fn from(dto: ConditionDto) -> Self {
        match dto.children {
            Some(children) if !children.is_empty() => Self::Group(ConditionGroup {
                operator: dto
                    .logical_operator
                    .as_deref()
                    .map(LogicalOperator::from)
                    .unwrap_or_default(),
                children: children.into_iter().map(ConditionNode::from).collect(),
            }),
            _ => Self::Leaf(Condition {
                field: dto.field,
                operator: Operator::from(dto.operator),
                value: dto.value,
            }),
        }
    }
}

impl From<ConditionNode> for ConditionDto {
    fn from(node: ConditionNode) -> Self {
        match node {
            ConditionNode::Leaf(cond) => Self {
                field: cond.field,
                operator: cond.operator.into(),
                value: cond.value,
                ..Default::default()
            },
            ConditionNode::Group(group) => Self {
                logical_operator: Some(group.operator.to_string()),
                children: Some(group.children.into_iter().map(Self::from).collect()),
                ..Default::default()
            },
        }
    }
}

/// 评估上下文 - 提供给规则引擎的输入文档
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    data: Value,
}

impl EvaluationContext {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 从 JSON 字符串创建
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: Value = serde_json::from_str(json)?;
        Ok(Self { data })
    }

    /// 按点号路径解析字段，如 "user.profile.age"
    pub fn resolve(&self, path: &str) -> Option<String> {
        document::resolve(&self.data, path)
    }

    /// 获取底层数据
    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// 规则条件的来源形态
#[derive(Debug, Clone)]
pub enum RuleCondition {
    /// 已解析的条件树
    Parsed(ConditionNode),
    /// 存储中的原始文本，评估前才解析
    Raw(String),
}

/// 参与评估的活动规则快照
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    pub id: Uuid,
    pub name: String,
    pub priority: i32,
    pub condition: RuleCondition,
}

impl RuleSnapshot {
    pub fn parsed(id: Uuid, name: impl Into<String>, priority: i32, root: ConditionNode) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            condition: RuleCondition::Parsed(root),
        }
    }

    pub fn raw(id: Uuid, name: impl Into<String>, priority: i32, raw: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            condition: RuleCondition::Raw(raw.into()),
        }
    }
}

impl From<&Rule> for RuleSnapshot {
    fn from(rule: &Rule) -> Self {
        Self::raw(rule.id, rule.name.clone(), rule.priority, rule.conditions.clone())
    }
}

/// 命中的叶子条件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedCondition {
    pub field: String,
    pub operator: Operator,
    pub value: Option<String>,
    pub reason: String,
}

/// 命中的规则
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRule {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub priority: i32,
    pub matched_conditions: Vec<MatchedCondition>,
}

/// 评估结果，按优先级降序排列
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub matched_rules: Vec<MatchedRule>,
}

impl EvaluationResult {
    pub fn is_empty(&self) -> bool {
        self.matched_rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matched_rules.len()
    }
}
