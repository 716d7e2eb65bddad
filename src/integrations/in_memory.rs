//! 内存数据源（测试与本地演示用，无需任何外部服务）
//!
//! 同时实现 TaskSource / CalendarSource / EmailSource；记录每次调用，可按数据源注入失败。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::integrations::{
    CalendarEvent, CalendarSource, CreatedEvent, CreatedTask, EmailReply, EmailSource, EmailSummary,
    NewEvent, NewTask, Task, TaskSource,
};

/// 注入的失败：Some(msg) 为带消息的错误，Some("") 为无消息错误
#[derive(Debug, Default, Clone)]
struct Failures {
    tasks: Option<String>,
    calendar: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryWorkspace {
    tasks: Mutex<Vec<Task>>,
    events: Mutex<Vec<CalendarEvent>>,
    emails: Mutex<Vec<EmailSummary>>,
    sent: Mutex<Vec<EmailReply>>,
    failures: Mutex<Failures>,
    calls: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(self, tasks: Vec<Task>) -> Self {
        *lock(&self.tasks) = tasks;
        self
    }

    pub fn with_events(self, events: Vec<CalendarEvent>) -> Self {
        *lock(&self.events) = events;
        self
    }

    pub fn with_emails(self, emails: Vec<EmailSummary>) -> Self {
        *lock(&self.emails) = emails;
        self
    }

    /// 之后所有任务相关调用都失败
    pub fn fail_tasks(&self, message: impl Into<String>) {
        lock(&self.failures).tasks = Some(message.into());
    }

    pub fn fail_calendar(&self, message: impl Into<String>) {
        lock(&self.failures).calendar = Some(message.into());
    }

    pub fn fail_email(&self, message: impl Into<String>) {
        lock(&self.failures).email = Some(message.into());
    }

    /// 累计调用次数（读写都算）
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tasks(&self) -> Vec<Task> {
        lock(&self.tasks).clone()
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        lock(&self.events).clone()
    }

    pub fn sent_replies(&self) -> Vec<EmailReply> {
        lock(&self.sent).clone()
    }

    fn enter(&self, failure: Option<String>) -> Result<(), AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match failure {
            Some(msg) => Err(AgentError::Source(msg)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TaskSource for InMemoryWorkspace {
    async fn fetch(&self) -> Result<Vec<Task>, AgentError> {
        self.enter(lock(&self.failures).tasks.clone())?;
        Ok(self.tasks())
    }

    async fn create(&self, task: NewTask) -> Result<CreatedTask, AgentError> {
        self.enter(lock(&self.failures).tasks.clone())?;
        let mut tasks = lock(&self.tasks);
        let id = format!("task-{}", tasks.len() + 1);
        let url = format!("https://notion.local/{id}");
        tasks.push(Task {
            id: id.clone(),
            title: task.title,
            status: task.status.unwrap_or_else(|| "Not Started".to_string()),
            due: task.due,
            url: url.clone(),
        });
        Ok(CreatedTask { id, url })
    }

    async fn update_status(&self, task_id: &str, status: &str) -> Result<(), AgentError> {
        self.enter(lock(&self.failures).tasks.clone())?;
        let mut tasks = lock(&self.tasks);
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| AgentError::Source(format!("Task not found: {task_id}")))?;
        task.status = status.to_string();
        Ok(())
    }
}

#[async_trait]
impl CalendarSource for InMemoryWorkspace {
    async fn list_upcoming(&self) -> Result<Vec<CalendarEvent>, AgentError> {
        self.enter(lock(&self.failures).calendar.clone())?;
        Ok(self.events())
    }

    async fn create(&self, event: NewEvent) -> Result<CreatedEvent, AgentError> {
        self.enter(lock(&self.failures).calendar.clone())?;
        let mut events = lock(&self.events);
        let id = format!("event-{}", events.len() + 1);
        events.push(CalendarEvent {
            id: id.clone(),
            summary: event.summary,
            start: event.start,
            end: event.end,
            hangout_link: None,
            description: event.description,
        });
        Ok(CreatedEvent {
            link: Some(format!("https://calendar.local/{id}")),
            id,
        })
    }
}

#[async_trait]
impl EmailSource for InMemoryWorkspace {
    async fn list_unread(&self) -> Result<Vec<EmailSummary>, AgentError> {
        self.enter(lock(&self.failures).email.clone())?;
        Ok(lock(&self.emails).clone())
    }

    async fn send_reply(&self, reply: EmailReply) -> Result<(), AgentError> {
        self.enter(lock(&self.failures).email.clone())?;
        lock(&self.sent).push(reply);
        Ok(())
    }
}
