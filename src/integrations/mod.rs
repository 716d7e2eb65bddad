//! 外部数据源：任务库（Notion）、日历（Google Calendar）、邮件（Gmail）
//!
//! 编排核心只依赖这里的三个 trait 与最小字段集合；具体 REST 客户端见各子模块。
//! 客户端在进程启动时构造一次，以 `Arc<dyn ...>` 注入快照层与动作分发器。

pub mod calendar;
pub mod gmail;
pub mod in_memory;
pub mod notion;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;

pub use calendar::GoogleCalendarClient;
pub use gmail::GmailClient;
pub use in_memory::InMemoryWorkspace;
pub use notion::NotionClient;

/// 任务库中的一条任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: String,
    pub due: Option<String>,
    pub url: String,
}

/// 新建任务的返回
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedTask {
    pub id: String,
    pub url: String,
}

/// 新建任务参数（同时作为 create_notion_task 的参数 schema）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    /// ISO 8601 date or datetime string
    #[serde(default)]
    pub due: Option<String>,
    /// Status value available in Notion
    #[serde(default)]
    pub status: Option<String>,
}

/// 日历中的一条日程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    pub hangout_link: Option<String>,
    pub description: Option<String>,
}

/// 新建日程的返回
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    pub link: Option<String>,
}

/// 新建日程参数（同时作为 create_calendar_event 的参数 schema）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    /// ISO 8601 datetime string
    pub start: String,
    /// ISO 8601 datetime string
    pub end: String,
    /// Attendee email addresses
    #[serde(default)]
    pub attendees: Option<Vec<String>>,
    /// IANA time zone (e.g. "Europe/Berlin") for start/end given without a UTC offset
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// 未读邮件摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub snippet: String,
    pub internal_date: Option<String>,
}

/// 回复邮件参数（同时作为 send_email_reply 的参数 schema）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailReply {
    pub thread_id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// 任务源
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Task>, AgentError>;

    async fn create(&self, task: NewTask) -> Result<CreatedTask, AgentError>;

    async fn update_status(&self, task_id: &str, status: &str) -> Result<(), AgentError>;
}

/// 日历源
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn list_upcoming(&self) -> Result<Vec<CalendarEvent>, AgentError>;

    async fn create(&self, event: NewEvent) -> Result<CreatedEvent, AgentError>;
}

/// 邮件源
#[async_trait]
pub trait EmailSource: Send + Sync {
    async fn list_unread(&self) -> Result<Vec<EmailSummary>, AgentError>;

    async fn send_reply(&self, reply: EmailReply) -> Result<(), AgentError>;
}

/// 非 2xx 响应转为 AgentError::Http（保留响应体，便于在动作记录里看到原因）
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, AgentError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AgentError::Http {
        status: status.as_u16(),
        body,
    })
}

/// 统一构造带超时的 reqwest Client
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(concat!("deskmate/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}
