//! 规则引擎集成测试
//!
//! 测试规则存储、缓存、解析、执行、排序的完整工作流。

use rule_engine::{
    ActiveRuleCache, Condition, ConditionNode, EvaluationContext, EvaluationService,
    InMemoryRuleStore, NewRule, Operator, Rule, RuleCompiler, RuleExecutor, RuleSetEvaluator,
    RuleSnapshot,
};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

fn context(value: Value) -> EvaluationContext {
    EvaluationContext::new(value)
}

fn raw_rule(name: &str, priority: i32, conditions: &str) -> RuleSnapshot {
    RuleSnapshot::raw(Uuid::new_v4(), name, priority, conditions)
}

/// 创建测试上下文：模拟一笔订单
fn create_order_context() -> EvaluationContext {
    context(json!({
        "status": "active",
        "amount": 1500,
        "currency": "USD",
        "customer": {
            "tier": "Gold",
            "email": "alice@example.com",
            "age": 34,
            "country": "DE"
        },
        "items": [
            { "sku": "A-1", "qty": 2 },
            { "sku": "B-7", "qty": 1 }
        ],
        "coupon": null
    }))
}

// ==================== 典型场景 ====================

#[test]
fn test_and_group_matches_with_two_conditions() {
    let rules = vec![raw_rule(
        "Active big order",
        10,
        r#"{
            "logicalOperator": "And",
            "children": [
                { "field": "status", "operator": "Equals", "value": "active" },
                { "field": "amount", "operator": "GreaterThan", "value": "100" }
            ]
        }"#,
    )];

    let result = RuleSetEvaluator::new().evaluate_all(
        &context(json!({ "status": "active", "amount": 500 })),
        &rules,
    );

    assert_eq!(result.len(), 1);
    assert_eq!(result.matched_rules[0].matched_conditions.len(), 2);
}

#[test]
fn test_or_group_without_match() {
    let rules = vec![raw_rule(
        "Premium",
        10,
        r#"{
            "logicalOperator": "Or",
            "children": [
                { "field": "tier", "operator": "Equals", "value": "gold" },
                { "field": "amount", "operator": "GreaterThan", "value": "10000" }
            ]
        }"#,
    )];

    let result = RuleSetEvaluator::new().evaluate_all(
        &context(json!({ "tier": "silver", "amount": 500 })),
        &rules,
    );

    assert!(result.is_empty());
}

#[test]
fn test_nested_field_numeric_comparison() {
    let rules = vec![raw_rule(
        "Adult",
        1,
        r#"{ "field": "user.age", "operator": "GreaterThan", "value": "17" }"#,
    )];
    let evaluator = RuleSetEvaluator::new();

    let adult = evaluator.evaluate_all(&context(json!({ "user": { "age": 25 } })), &rules);
    assert_eq!(adult.len(), 1);

    let unknown = evaluator.evaluate_all(&context(json!({ "user": { "name": "Alice" } })), &rules);
    assert!(unknown.is_empty());
}

#[test]
fn test_one_broken_rule_does_not_fail_the_batch() {
    let rules = vec![
        raw_rule(
            "Status",
            1,
            r#"{ "field": "status", "operator": "Equals", "value": "active" }"#,
        ),
        raw_rule("Broken", 50, r#"{ "field": "status", "operator": "#),
        raw_rule(
            "Amount",
            5,
            r#"{ "field": "amount", "operator": "GreaterThanOrEquals", "value": "1500" }"#,
        ),
        raw_rule(
            "Country",
            3,
            r#"{ "field": "customer.country", "operator": "Equals", "value": "FR" }"#,
        ),
    ];

    let result = RuleSetEvaluator::new().evaluate_all(&create_order_context(), &rules);

    let names: Vec<_> = result
        .matched_rules
        .iter()
        .map(|r| r.rule_name.as_str())
        .collect();
    assert_eq!(names, vec!["Amount", "Status"]);
}

#[test]
fn test_results_ordered_by_priority() {
    let condition = r#"{ "field": "status", "operator": "IsNotNull" }"#;
    let rules = vec![
        raw_rule("ten", 10, condition),
        raw_rule("hundred", 100, condition),
        raw_rule("fifty", 50, condition),
    ];

    let result = RuleSetEvaluator::new().evaluate_all(&create_order_context(), &rules);

    let priorities: Vec<i32> = result.matched_rules.iter().map(|r| r.priority).collect();
    assert_eq!(priorities, vec![100, 50, 10]);
}

// ==================== 操作符语义 ====================

#[test]
fn test_operators_against_order() {
    let ctx = create_order_context();
    let executor = RuleExecutor::new();

    let cases = vec![
        (ConditionNode::leaf("customer.tier", Operator::Equals, "gold"), true),
        (ConditionNode::leaf("customer.tier", Operator::NotEquals, "gold"), false),
        (ConditionNode::leaf("customer.email", Operator::Contains, "@EXAMPLE"), true),
        (ConditionNode::leaf("customer.email", Operator::StartsWith, "alice"), true),
        (ConditionNode::leaf("customer.email", Operator::EndsWith, ".org"), false),
        (ConditionNode::leaf("currency", Operator::In, "eur, usd, gbp"), true),
        (ConditionNode::leaf("customer.age", Operator::LessThan, "18"), false),
        (ConditionNode::leaf("customer.age", Operator::LessThanOrEquals, "34"), true),
        (ConditionNode::leaf("amount", Operator::GreaterThanOrEquals, "1500.0"), true),
        // 非数字字段参与数值比较
        (ConditionNode::leaf("currency", Operator::GreaterThan, "0"), false),
        (ConditionNode::Leaf(Condition::unary("coupon", Operator::IsNull)), true),
        (ConditionNode::Leaf(Condition::unary("missing", Operator::IsNull)), true),
        (ConditionNode::Leaf(Condition::unary("items", Operator::IsNotNull)), true),
        // 结构化值按 JSON 文本比较
        (
            ConditionNode::leaf("items", Operator::Contains, r#""sku":"B-7""#),
            true,
        ),
        (
            ConditionNode::leaf("status", Operator::Unsupported("Matches".to_string()), "active"),
            false,
        ),
    ];

    for (node, expected) in cases {
        let outcome = executor.evaluate(&node, &ctx);
        assert_eq!(outcome.matched, expected, "condition: {:?}", node);
    }
}

#[test]
fn test_not_equals_on_absent_field() {
    let rules = vec![raw_rule(
        "Not blocked",
        1,
        r#"{ "field": "flags.blocked", "operator": "NotEquals", "value": "true" }"#,
    )];

    let result = RuleSetEvaluator::new().evaluate_all(&create_order_context(), &rules);
    assert_eq!(result.len(), 1);
}

#[test]
fn test_reason_mentions_values() {
    let rules = vec![raw_rule(
        "High Value",
        1,
        r#"{ "field": "amount", "operator": "GreaterThan", "value": "1000" }"#,
    )];

    let result = RuleSetEvaluator::new().evaluate_all(&create_order_context(), &rules);
    let reason = &result.matched_rules[0].matched_conditions[0].reason;

    assert!(reason.contains("amount"));
    assert!(reason.contains("GreaterThan"));
    assert!(reason.contains("1500"));
    assert!(reason.contains("1000"));
}

// ==================== 序列化往返 ====================

#[test]
fn test_round_trip_preserves_outcome() {
    let tree = ConditionNode::and(vec![
        ConditionNode::leaf("status", Operator::Equals, "active"),
        ConditionNode::or(vec![
            ConditionNode::leaf("customer.tier", Operator::In, "gold,platinum"),
            ConditionNode::leaf("amount", Operator::GreaterThan, "10000"),
        ]),
        ConditionNode::Leaf(Condition::unary("coupon", Operator::IsNull)),
    ]);

    let text = RuleCompiler::serialize_condition(&tree).unwrap();
    let reparsed = RuleCompiler::parse_condition(&text).unwrap();

    let documents = vec![
        create_order_context(),
        context(json!({ "status": "active", "customer": { "tier": "silver" }, "amount": 20000 })),
        context(json!({ "status": "inactive" })),
        context(json!({ "status": "active", "customer": { "tier": "platinum" }, "coupon": "X" })),
    ];

    let executor = RuleExecutor::new();
    for doc in &documents {
        let before = executor.evaluate(&tree, doc);
        let after = executor.evaluate(&reparsed, doc);
        assert_eq!(before.matched, after.matched);
        assert_eq!(before.matched_conditions, after.matched_conditions);
    }
}

#[test]
fn test_result_json_shape() {
    let rules = vec![raw_rule(
        "Status Check",
        3,
        r#"{ "field": "status", "operator": "Equals", "value": "active" }"#,
    )];

    let result = RuleSetEvaluator::new().evaluate_all(&create_order_context(), &rules);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["matchedRules"][0]["ruleName"], "Status Check");
    assert_eq!(json["matchedRules"][0]["priority"], 3);
    assert_eq!(
        json["matchedRules"][0]["matchedConditions"][0],
        json!({
            "field": "status",
            "operator": "Equals",
            "value": "active",
            "reason": "Field 'status' ('active') satisfies Equals 'active'"
        })
    );
}

// ==================== 完整工作流 ====================

#[test]
fn test_full_workflow_with_store_and_cache() {
    let cache = Arc::new(ActiveRuleCache::default());
    let store = InMemoryRuleStore::new().with_cache(cache.clone());

    let high_value = store
        .create(NewRule::new(
            "High Value",
            100,
            ConditionNode::leaf("amount", Operator::GreaterThan, "1000"),
        ))
        .unwrap();
    store
        .create(
            NewRule::new(
                "Disabled",
                500,
                ConditionNode::leaf("status", Operator::Equals, "active"),
            )
            .inactive(),
        )
        .unwrap();

    let service = EvaluationService::new(Arc::new(store.clone())).with_cache(cache.clone());

    let result = service.evaluate(&create_order_context()).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.matched_rules[0].rule_id, high_value.id);
    assert!(cache.is_cached());

    // 更新规则后缓存失效，新规则立即生效
    store
        .update(
            high_value.id,
            NewRule::new(
                "High Value",
                100,
                ConditionNode::leaf("amount", Operator::GreaterThan, "5000"),
            ),
        )
        .unwrap();
    assert!(!cache.is_cached());

    let result = service.evaluate(&create_order_context()).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_imported_records_with_broken_conditions() {
    let store = InMemoryRuleStore::new();
    let records: Vec<Rule> = serde_json::from_value(json!([
        {
            "id": Uuid::new_v4(),
            "name": "Gold customers",
            "isActive": true,
            "priority": 2,
            "conditions": r#"{"Field":"customer.tier","Operator":"Equals","Value":"gold","LogicalOperator":null,"Children":null}"#
        },
        {
            "id": Uuid::new_v4(),
            "name": "Corrupt",
            "isActive": true,
            "priority": 9,
            "conditions": ""
        }
    ]))
    .unwrap();
    store.import(records);

    let service = EvaluationService::new(Arc::new(store));
    let result = service
        .evaluate_json(r#"{ "customer": { "tier": "GOLD" } }"#)
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.matched_rules[0].rule_name, "Gold customers");
}

#[test]
fn test_concurrent_evaluations_share_snapshot() {
    use std::thread;

    let store = InMemoryRuleStore::new();
    for i in 0..20 {
        store
            .create(NewRule::new(
                format!("rule-{}", i),
                i,
                ConditionNode::leaf("n", Operator::GreaterThanOrEquals, i.to_string()),
            ))
            .unwrap();
    }

    let service = Arc::new(
        EvaluationService::new(Arc::new(store)).with_cache(Arc::new(ActiveRuleCache::default())),
    );

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let service = service.clone();
            thread::spawn(move || {
                let result = service.evaluate(&context(json!({ "n": n }))).unwrap();
                (n, result)
            })
        })
        .collect();

    for handle in handles {
        let (n, result) = handle.join().unwrap();
        assert_eq!(result.len(), n as usize + 1);
        assert_eq!(result.matched_rules[0].priority, n);
    }
}
