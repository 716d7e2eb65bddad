//! 错误类型
//!
//! 库内统一返回 AgentError；数据源失败由快照层降级为样例数据，动作失败由编排循环记为 error 记录，
//! 只有配置错误与 LLM 调用失败会一路冒泡到 HTTP 层。

use thiserror::Error;

/// 编排过程中可能出现的错误（配置、数据源、HTTP、LLM、动作分发）
#[derive(Error, Debug)]
pub enum AgentError {
    /// 缺少必需的凭据或配置项
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Config(Vec<String>),

    /// 数据源返回了无法解析或不符合预期的内容
    #[error("{0}")]
    Source(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    /// 动作名不在固定目录内（契约违例，不可重试）
    #[error("Unhandled action: {0}")]
    UnhandledAction(String),

    #[error("Invalid arguments for {action}: {reason}")]
    InvalidArguments { action: String, reason: String },

    #[error("{0}")]
    ActionFailed(String),

    #[error("Action timed out: {0}")]
    ActionTimeout(String),
}

impl AgentError {
    /// 未配置的必需项 -> Config 错误；全部存在时返回 Ok
    pub fn require(fields: &[(&str, Option<&str>)]) -> Result<(), AgentError> {
        let missing: Vec<String> = fields
            .iter()
            .filter(|(_, v)| v.map_or(true, |s| s.trim().is_empty()))
            .map(|(k, _)| k.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AgentError::Config(missing))
        }
    }
}
