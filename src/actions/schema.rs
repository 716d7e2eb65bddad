//! 动作参数 Schema 与校验（schemars 自动生成，发送给模型的 schema 与校验用的是同一个类型）

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::core::AgentError;

/// update_notion_task_status 的参数
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusArgs {
    pub task_id: String,
    pub status: String,
}

/// 类型 T 的参数 JSON Schema
///
/// 根上的 $schema / title / description 来自 Rust 类型名与文档注释，不发给模型；字段级描述保留。
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| {
        serde_json::json!({ "type": "object", "properties": {} })
    });
    if let Some(obj) = value.as_object_mut() {
        for key in ["$schema", "title", "description"] {
            obj.remove(key);
        }
    }
    value
}

/// 把模型给的参数解析成类型 T；非对象或缺字段时返回 InvalidArguments
pub fn parse_args<T: DeserializeOwned>(action: &str, args: Value) -> Result<T, AgentError> {
    if !args.is_object() {
        return Err(AgentError::InvalidArguments {
            action: action.to_string(),
            reason: "arguments must be a JSON object".to_string(),
        });
    }
    serde_json::from_value(args).map_err(|e| AgentError::InvalidArguments {
        action: action.to_string(),
        reason: e.to_string(),
    })
}

/// 校验通过的 ISO 8601 日期时间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoDateTime {
    /// 下发给外部 API 的写法：带偏移时保持原样，缺秒时补齐为 RFC 3339；无偏移时为本地时间 `%Y-%m-%dT%H:%M:%S`
    pub wire: String,
    pub has_offset: bool,
}

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// 接受 RFC 3339、带偏移但缺秒（`2024-05-01T17:00Z`）以及不带偏移的本地时间
pub fn parse_iso_datetime(value: &str) -> Option<IsoDateTime> {
    let value = value.trim();
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return Some(IsoDateTime {
            wire: value.to_string(),
            has_offset: true,
        });
    }
    let zoned = match value.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        Some(head) => format!("{head}+00:00"),
        None => value.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_str(&zoned, "%Y-%m-%dT%H:%M%:z") {
        return Some(IsoDateTime {
            wire: dt.to_rfc3339(),
            has_offset: true,
        });
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| IsoDateTime {
            wire: dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            has_offset: false,
        })
}

/// ISO 8601 日期时间（偏移可选）
pub fn require_datetime(action: &str, field: &str, value: &str) -> Result<IsoDateTime, AgentError> {
    parse_iso_datetime(value).ok_or_else(|| AgentError::InvalidArguments {
        action: action.to_string(),
        reason: format!("`{field}` must be an ISO 8601 datetime, got {value:?}"),
    })
}

/// ISO 8601 日期或日期时间（Notion 的 Due 两者皆可）
///
/// 返回下发用的写法：纯日期原样返回，日期时间按 IsoDateTime::wire 规整
pub fn require_date_or_datetime(action: &str, field: &str, value: &str) -> Result<String, AgentError> {
    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        return Ok(value.to_string());
    }
    require_datetime(action, field, value).map(|dt| dt.wire)
}

/// 必填字符串不能是空白
pub fn require_non_empty(action: &str, field: &str, value: &str) -> Result<(), AgentError> {
    if value.trim().is_empty() {
        return Err(AgentError::InvalidArguments {
            action: action.to_string(),
            reason: format!("`{field}` must not be empty"),
        });
    }
    Ok(())
}
