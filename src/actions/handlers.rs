//! 四种动作的实现：参数 1:1 映射到外部协作者调用；更新状态与发信返回合成的 {"ok": true}

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::actions::schema::{
    parameters_schema, parse_args, require_date_or_datetime, require_datetime, require_non_empty,
    UpdateStatusArgs,
};
use crate::actions::{Action, ActionKind};
use crate::core::AgentError;
use crate::integrations::{CalendarSource, EmailReply, EmailSource, NewEvent, NewTask, TaskSource};

const DEFAULT_TIME_ZONE: &str = "UTC";

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, AgentError> {
    serde_json::to_value(value).map_err(|e| AgentError::ActionFailed(e.to_string()))
}

/// create_notion_task
pub struct CreateTaskAction {
    tasks: Arc<dyn TaskSource>,
}

impl CreateTaskAction {
    pub fn new(tasks: Arc<dyn TaskSource>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl Action for CreateTaskAction {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateNotionTask
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<NewTask>()
    }

    async fn execute(&self, args: Value) -> Result<Value, AgentError> {
        let name = self.kind().name();
        let mut task: NewTask = parse_args(name, args)?;
        require_non_empty(name, "title", &task.title)?;
        task.due = match task.due.as_deref().filter(|d| !d.is_empty()) {
            Some(due) => Some(require_date_or_datetime(name, "due", due)?),
            None => None,
        };
        to_value(self.tasks.create(task).await?)
    }
}

/// update_notion_task_status
pub struct UpdateTaskStatusAction {
    tasks: Arc<dyn TaskSource>,
}

impl UpdateTaskStatusAction {
    pub fn new(tasks: Arc<dyn TaskSource>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl Action for UpdateTaskStatusAction {
    fn kind(&self) -> ActionKind {
        ActionKind::UpdateNotionTaskStatus
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<UpdateStatusArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, AgentError> {
        let name = self.kind().name();
        let args: UpdateStatusArgs = parse_args(name, args)?;
        require_non_empty(name, "taskId", &args.task_id)?;
        require_non_empty(name, "status", &args.status)?;
        self.tasks.update_status(&args.task_id, &args.status).await?;
        Ok(json!({ "ok": true }))
    }
}

/// create_calendar_event
pub struct CreateEventAction {
    calendar: Arc<dyn CalendarSource>,
}

impl CreateEventAction {
    pub fn new(calendar: Arc<dyn CalendarSource>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Action for CreateEventAction {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateCalendarEvent
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<NewEvent>()
    }

    async fn execute(&self, args: Value) -> Result<Value, AgentError> {
        let name = self.kind().name();
        let mut event: NewEvent = parse_args(name, args)?;
        require_non_empty(name, "summary", &event.summary)?;
        let start = require_datetime(name, "start", &event.start)?;
        let end = require_datetime(name, "end", &event.end)?;
        // 本地时间必须配合时区，未给出时按 UTC
        if (!start.has_offset || !end.has_offset) && event.time_zone.is_none() {
            event.time_zone = Some(DEFAULT_TIME_ZONE.to_string());
        }
        event.start = start.wire;
        event.end = end.wire;
        to_value(self.calendar.create(event).await?)
    }
}

/// send_email_reply
pub struct SendReplyAction {
    email: Arc<dyn EmailSource>,
}

impl SendReplyAction {
    pub fn new(email: Arc<dyn EmailSource>) -> Self {
        Self { email }
    }
}

#[async_trait]
impl Action for SendReplyAction {
    fn kind(&self) -> ActionKind {
        ActionKind::SendEmailReply
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<EmailReply>()
    }

    async fn execute(&self, args: Value) -> Result<Value, AgentError> {
        let name = self.kind().name();
        let reply: EmailReply = parse_args(name, args)?;
        require_non_empty(name, "threadId", &reply.thread_id)?;
        require_non_empty(name, "to", &reply.to)?;
        self.email.send_reply(reply).await?;
        Ok(json!({ "ok": true }))
    }
}
