//! 输入文档字段访问
//!
//! 按点号分隔的路径在任意 JSON 文档中查找字段，并归一化为可比较的字符串。

use serde_json::Value;

/// 解析字段路径，返回归一化后的标量字符串
///
/// - 路径上任意一层不是对象、或属性不存在，返回 `None`
/// - `null` 返回 `None`
/// - 字符串返回其本身（不带引号）
/// - 数字、布尔、对象、数组返回其 JSON 文本
///
/// 数组不可按下标进入，`"items.0"` 视为不存在。
/// 数字保留文档中的原始文本，不经过 `f64`。
pub fn resolve(document: &Value, path: &str) -> Option<String> {
    let mut current = document;

    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    normalize(current)
}

/// 终端值归一化
pub fn normalize(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
