//! 上下文快照：并发读取任务 / 日程 / 邮件三个数据源，单源失败时回落到示例数据
//!
//! 三个源互不影响：`tokio::join!` 等待全部结果后再逐个分类。
//! - 成功：source=live
//! - 失败且带消息：source=error，error=消息
//! - 失败但无消息，或未接入该数据源：source=sample，error="Using sample <domain>"
//!
//! 只读一次，不重试。

pub mod context;
pub mod sample;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::core::AgentError;
use crate::integrations::{CalendarEvent, CalendarSource, EmailSource, EmailSummary, Task, TaskSource};

pub use context::context_message;
pub use sample::{sample_emails, sample_events, sample_tasks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Live,
    Sample,
    Error,
}

/// 单个数据源的读取结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section<T> {
    pub data: Vec<T>,
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Section<T> {
    pub fn live(data: Vec<T>) -> Self {
        Self {
            data,
            source: SourceKind::Live,
            error: None,
        }
    }

    /// 按失败消息分类；无消息时给出通用提示
    pub fn fallback(data: Vec<T>, domain: &str, message: Option<String>) -> Self {
        match message.filter(|m| !m.trim().is_empty()) {
            Some(msg) => Self {
                data,
                source: SourceKind::Error,
                error: Some(msg),
            },
            None => Self {
                data,
                source: SourceKind::Sample,
                error: Some(format!("Using sample {domain}")),
            },
        }
    }

    pub fn is_live(&self) -> bool {
        self.source == SourceKind::Live
    }
}

/// 一次请求内的三源快照，不做持久化
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSnapshot {
    pub tasks: Section<Task>,
    pub events: Section<CalendarEvent>,
    pub emails: Section<EmailSummary>,
}

/// 快照提供者；None 表示该数据源未接入
#[derive(Clone, Default)]
pub struct SnapshotProvider {
    tasks: Option<Arc<dyn TaskSource>>,
    calendar: Option<Arc<dyn CalendarSource>>,
    email: Option<Arc<dyn EmailSource>>,
}

impl SnapshotProvider {
    pub fn new(
        tasks: Option<Arc<dyn TaskSource>>,
        calendar: Option<Arc<dyn CalendarSource>>,
        email: Option<Arc<dyn EmailSource>>,
    ) -> Self {
        Self {
            tasks,
            calendar,
            email,
        }
    }

    pub async fn get_snapshot(&self) -> ContextSnapshot {
        let (tasks, events, emails) = tokio::join!(
            read_source("tasks", self.tasks.as_ref().map(|s| s.fetch()), sample_tasks),
            read_source("events", self.calendar.as_ref().map(|s| s.list_upcoming()), sample_events),
            read_source("emails", self.email.as_ref().map(|s| s.list_unread()), sample_emails),
        );
        ContextSnapshot {
            tasks,
            events,
            emails,
        }
    }
}

async fn read_source<T, F>(domain: &str, fetch: Option<F>, sample: fn() -> Vec<T>) -> Section<T>
where
    F: Future<Output = Result<Vec<T>, AgentError>>,
{
    let Some(fetch) = fetch else {
        tracing::debug!(domain, "source not configured, using sample data");
        return Section::fallback(sample(), domain, None);
    };
    match fetch.await {
        Ok(data) => Section::live(data),
        Err(e) => {
            let message = e.to_string();
            tracing::warn!(domain, error = %message, "source fetch failed, falling back to sample data");
            Section::fallback(sample(), domain, Some(message))
        }
    }
}
