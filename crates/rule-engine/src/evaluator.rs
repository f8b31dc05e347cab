//! 条件评估器
//!
//! 实现各操作符的比较语义。两侧的值都已归一化为字符串：
//! 字符串比较一律大小写不敏感，数值比较基于十进制高精度数。
//! 评估永不失败，类型不匹配或字段缺失只会让条件不成立。

use crate::operators::Operator;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::str::FromStr;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `operator` - 操作符
    /// * `field_value` - 从文档中解析出的字段值，`None` 表示字段缺失或为 null
    /// * `literal` - 规则中定义的比较值
    pub fn evaluate(operator: &Operator, field_value: Option<&str>, literal: Option<&str>) -> bool {
        match operator {
            Operator::Equals => Self::equals(field_value, literal),
            Operator::NotEquals => !Self::equals(field_value, literal),
            Operator::Contains => {
                Self::both(field_value, literal, |f, l| fold(f).contains(&fold(l)))
            }
            Operator::StartsWith => {
                Self::both(field_value, literal, |f, l| fold(f).starts_with(&fold(l)))
            }
            Operator::EndsWith => {
                Self::both(field_value, literal, |f, l| fold(f).ends_with(&fold(l)))
            }
            Operator::IsNull => field_value.is_none(),
            Operator::IsNotNull => field_value.is_some(),
            Operator::GreaterThan => Self::compare(field_value, literal, Ordering::is_gt),
            Operator::GreaterThanOrEquals => Self::compare(field_value, literal, Ordering::is_ge),
            Operator::LessThan => Self::compare(field_value, literal, Ordering::is_lt),
            Operator::LessThanOrEquals => Self::compare(field_value, literal, Ordering::is_le),
            Operator::In => Self::in_list(field_value, literal),
            Operator::Unsupported(_) => false,
        }
    }

    /// 生成命中原因描述
    pub fn reason(
        field: &str,
        operator: &Operator,
        field_value: Option<&str>,
        literal: Option<&str>,
    ) -> String {
        let actual = field_value.unwrap_or_default();
        match operator {
            Operator::IsNull => format!("Field '{}' is null", field),
            Operator::IsNotNull => format!("Field '{}' is not null (value: '{}')", field, actual),
            _ => format!(
                "Field '{}' ('{}') satisfies {} '{}'",
                field,
                actual,
                operator,
                literal.unwrap_or_default()
            ),
        }
    }

    /// 相等比较，任一侧缺失即不相等
    fn equals(field: Option<&str>, literal: Option<&str>) -> bool {
        Self::both(field, literal, |f, l| f == l || fold(f) == fold(l))
    }

    fn both<F>(field: Option<&str>, literal: Option<&str>, pred: F) -> bool
    where
        F: Fn(&str, &str) -> bool,
    {
        match (field, literal) {
            (Some(f), Some(l)) => pred(f, l),
            _ => false,
        }
    }

    /// 数值比较，任一侧无法解析为数字时返回 false
    fn compare<F>(field: Option<&str>, literal: Option<&str>, cmp: F) -> bool
    where
        F: Fn(Ordering) -> bool,
    {
        let (Some(f), Some(l)) = (field, literal) else {
            return false;
        };

        match (Self::parse_decimal(f), Self::parse_decimal(l)) {
            (Some(a), Some(b)) => cmp(a.cmp(&b)),
            _ => false,
        }
    }

    /// 列表包含检查，列表为逗号分隔的字符串
    fn in_list(field: Option<&str>, literal: Option<&str>) -> bool {
        Self::both(field, literal, |f, l| {
            let needle = fold(f);
            l.split(',').any(|item| fold(item.trim()) == needle)
        })
    }

    /// 解析十进制数
    ///
    /// 允许前后空白、前导 `+` 和科学计数法（如 `1.5e3`），不接受 `1_000` 这类数字分隔符。
    pub fn parse_decimal(s: &str) -> Option<Decimal> {
        let s = s.trim();
        if s.is_empty() || s.contains('_') {
            return None;
        }
        let s = s.strip_prefix('+').unwrap_or(s);

        Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .ok()
    }
}

/// 大小写折叠
fn fold(s: &str) -> String {
    s.to_lowercase()
}
