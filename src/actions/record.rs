//! 动作请求与动作记录
//!
//! ActionRequest 由模型产生、被分发器消费一次；ActionRecord 是执行结果，创建后不可变，
//! 按执行顺序追加到本次运行的动作日志。

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// 模型发出的一次动作请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// 模型侧的 tool call id，用于回填 tool 消息
    pub id: String,
    pub name: String,
    /// 参数；模型给出无法解析的 JSON 时保留原始字符串，由分发器报参数错误
    pub arguments: Value,
}

impl ActionRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// 从模型返回的参数字符串构造；空串视为 {}
    pub fn from_raw_arguments(id: impl Into<String>, name: impl Into<String>, raw: &str) -> Self {
        let arguments = if raw.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };
        Self::new(id, name, arguments)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// 单个动作的执行结果；response 仅在 success 时存在，error 仅在 error 时存在
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    #[serde(rename = "type")]
    action_type: String,
    payload: Map<String, Value>,
    status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// 非对象参数在日志里记为空 payload
fn payload_of(arguments: &Value) -> Map<String, Value> {
    arguments.as_object().cloned().unwrap_or_default()
}

impl ActionRecord {
    pub fn success(request: &ActionRequest, response: Value) -> Self {
        Self {
            action_type: request.name.clone(),
            payload: payload_of(&request.arguments),
            status: ActionStatus::Success,
            response: Some(response),
            error: None,
        }
    }

    pub fn failure(request: &ActionRequest, error: impl Into<String>) -> Self {
        Self {
            action_type: request.name.clone(),
            payload: payload_of(&request.arguments),
            status: ActionStatus::Error,
            response: None,
            error: Some(error.into()),
        }
    }

    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn status(&self) -> ActionStatus {
        self.status
    }

    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }

    /// 回填给模型的 tool 消息内容：成功为结果 JSON，失败为 {"error": msg}
    pub fn tool_message_content(&self) -> String {
        match (&self.response, &self.error) {
            (Some(response), _) => response.to_string(),
            (None, Some(error)) => json!({ "error": error }).to_string(),
            (None, None) => json!({ "ok": true }).to_string(),
        }
    }
}
