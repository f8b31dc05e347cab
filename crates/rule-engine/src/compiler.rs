//! 规则编译器
//!
//! 将存储中的条件文本解析为内存中的条件树，并预提取规则引用的字段路径。

use crate::error::{Result, RuleError};
use crate::models::{ConditionNode, RuleCondition, RuleSnapshot};
use std::collections::HashSet;
use uuid::Uuid;

/// 编译后的规则
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: Uuid,
    pub name: String,
    pub priority: i32,
    pub root: ConditionNode,
    /// 规则中使用的所有字段路径
    pub required_fields: HashSet<String>,
}

impl CompiledRule {
    /// 获取根节点
    pub fn root(&self) -> &ConditionNode {
        &self.root
    }
}

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 解析条件文本
    ///
    /// 空白文本或 JSON `null` 视为没有条件。
    pub fn parse_condition(raw: &str) -> Result<ConditionNode> {
        if raw.trim().is_empty() {
            return Err(RuleError::EmptyCondition);
        }

        let node: Option<ConditionNode> = serde_json::from_str(raw)?;
        node.ok_or(RuleError::EmptyCondition)
    }

    /// 序列化条件树
    pub fn serialize_condition(node: &ConditionNode) -> Result<String> {
        Ok(serde_json::to_string(node)?)
    }

    /// 编译规则快照
    pub fn compile(snapshot: &RuleSnapshot) -> Result<CompiledRule> {
        let root = match &snapshot.condition {
            RuleCondition::Parsed(node) => node.clone(),
            RuleCondition::Raw(raw) => Self::parse_condition(raw)?,
        };

        let mut required_fields = HashSet::new();
        Self::collect_fields(&root, &mut required_fields);

        Ok(CompiledRule {
            id: snapshot.id,
            name: snapshot.name.clone(),
            priority: snapshot.priority,
            root,
            required_fields,
        })
    }

    /// 递归收集字段
    fn collect_fields(node: &ConditionNode, fields: &mut HashSet<String>) {
        match node {
            ConditionNode::Leaf(cond) => {
                fields.insert(cond.field.clone());
            }
            ConditionNode::Group(group) => {
                for child in &group.children {
                    Self::collect_fields(child, fields);
                }
            }
        }
    }
}
