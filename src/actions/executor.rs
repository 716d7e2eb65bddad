//! 动作分发器
//!
//! 持有 ActionRegistry 与单次超时，dispatch(name, args) 在超时内执行对应动作；
//! 不重试、不回滚。每次调用输出一条结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::actions::{
    ActionRecord, ActionRegistry, ActionRequest, ActionSpec, CreateEventAction, CreateTaskAction,
    SendReplyAction, UpdateTaskStatusAction,
};
use crate::core::AgentError;
use crate::integrations::{CalendarSource, EmailSource, TaskSource};

pub struct ActionDispatcher {
    registry: ActionRegistry,
    timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(registry: ActionRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 固定四种动作的标准分发器
    pub fn standard(
        tasks: Arc<dyn TaskSource>,
        calendar: Arc<dyn CalendarSource>,
        email: Arc<dyn EmailSource>,
        timeout_secs: u64,
    ) -> Self {
        let mut registry = ActionRegistry::new();
        registry.register(CreateTaskAction::new(tasks.clone()));
        registry.register(UpdateTaskStatusAction::new(tasks));
        registry.register(CreateEventAction::new(calendar));
        registry.register(SendReplyAction::new(email));
        Self::new(registry, timeout_secs)
    }

    /// 分发一个动作；未知名字立即返回 UnhandledAction，其余失败原样上抛
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<Value, AgentError> {
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = match self.registry.get(name) {
            Ok(action) => match timeout(self.timeout, action.execute(args)).await {
                Ok(r) => r,
                Err(_) => Err(AgentError::ActionTimeout(name.to_string())),
            },
            Err(e) => Err(e),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(AgentError::UnhandledAction(_)) => "unhandled",
            Err(AgentError::ActionTimeout(_)) => "timeout",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "action_audit",
            "action": name,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "action");

        result
    }

    /// 执行一次请求并归一为 ActionRecord（失败不会中断调用方）
    pub async fn execute(&self, request: &ActionRequest) -> ActionRecord {
        match self.dispatch(&request.name, request.arguments.clone()).await {
            Ok(response) => ActionRecord::success(request, response),
            Err(e) => ActionRecord::failure(request, e.to_string()),
        }
    }

    pub fn catalog(&self) -> Vec<ActionSpec> {
        self.registry.catalog()
    }

    pub fn action_names(&self) -> Vec<&'static str> {
        self.registry.action_names()
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, ActionKind, ActionStatus};
    use crate::integrations::InMemoryWorkspace;
    use async_trait::async_trait;
    use serde_json::json;

    fn dispatcher(ws: &Arc<InMemoryWorkspace>) -> ActionDispatcher {
        ActionDispatcher::standard(ws.clone(), ws.clone(), ws.clone(), 5)
    }

    #[tokio::test]
    async fn test_catalog_has_exactly_four_actions_in_order() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let d = dispatcher(&ws);
        let names: Vec<String> = d.catalog().into_iter().map(|s| s.name).collect();
        assert_eq!(d.action_names(), names);
        assert_eq!(
            names,
            vec![
                "create_notion_task",
                "update_notion_task_status",
                "create_calendar_event",
                "send_email_reply"
            ]
        );
    }

    #[tokio::test]
    async fn test_create_task_returns_id_and_url() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let result = dispatcher(&ws)
            .dispatch("create_notion_task", json!({ "title": "write the quarterly report" }))
            .await
            .unwrap();
        assert_eq!(result, json!({ "id": "task-1", "url": "https://notion.local/task-1" }));
        assert_eq!(ws.tasks()[0].title, "write the quarterly report");
    }

    #[tokio::test]
    async fn test_update_status_returns_synthetic_ack() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let d = dispatcher(&ws);
        d.dispatch("create_notion_task", json!({ "title": "a" })).await.unwrap();
        let ack = d
            .dispatch("update_notion_task_status", json!({ "taskId": "task-1", "status": "Done" }))
            .await
            .unwrap();
        assert_eq!(ack, json!({ "ok": true }));
        assert_eq!(ws.tasks()[0].status, "Done");
    }

    #[tokio::test]
    async fn test_calendar_and_email_actions() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let d = dispatcher(&ws);
        let created = d
            .dispatch(
                "create_calendar_event",
                json!({
                    "summary": "Design review",
                    "start": "2024-05-01T10:00:00Z",
                    "end": "2024-05-01T11:00:00Z",
                    "attendees": ["emma@example.com"]
                }),
            )
            .await
            .unwrap();
        assert_eq!(created["id"], "event-1");
        assert_eq!(created["link"], "https://calendar.local/event-1");

        let ack = d
            .dispatch(
                "send_email_reply",
                json!({ "threadId": "t1", "to": "emma@example.com", "subject": "Re: hi", "body": "Thanks!" }),
            )
            .await
            .unwrap();
        assert_eq!(ack, json!({ "ok": true }));
        assert_eq!(ws.sent_replies()[0].thread_id, "t1");
    }

    #[tokio::test]
    async fn test_local_and_minute_precision_datetimes_accepted() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let d = dispatcher(&ws);
        d.dispatch("create_notion_task", json!({ "title": "x", "due": "2024-05-01T17:00:00" }))
            .await
            .unwrap();
        d.dispatch("create_notion_task", json!({ "title": "y", "due": "2024-05-01T17:00Z" }))
            .await
            .unwrap();
        assert_eq!(ws.tasks()[0].due.as_deref(), Some("2024-05-01T17:00:00"));
        assert_eq!(ws.tasks()[1].due.as_deref(), Some("2024-05-01T17:00:00+00:00"));

        d.dispatch(
            "create_calendar_event",
            json!({ "summary": "Sync", "start": "2024-05-01T10:00:00", "end": "2024-05-01T10:30" }),
        )
        .await
        .unwrap();
        let event = &ws.events()[0];
        assert_eq!(event.start, "2024-05-01T10:00:00");
        assert_eq!(event.end, "2024-05-01T10:30:00");
        assert_eq!(ws.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unknown_action_is_unhandled_and_makes_no_calls() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let err = dispatcher(&ws).dispatch("delete_all_tasks", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::UnhandledAction(_)));
        assert_eq!(err.to_string(), "Unhandled action: delete_all_tasks");
        assert_eq!(ws.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail_before_collaborator_call() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let d = dispatcher(&ws);
        let err = d
            .dispatch(
                "create_calendar_event",
                json!({ "summary": "x", "start": "next tuesday", "end": "2024-05-01T11:00:00Z" }),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("create_calendar_event"));
        assert!(err.to_string().contains("start"));

        let err = d.dispatch("create_notion_task", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments { .. }));
        assert_eq!(ws.call_count(), 0);
    }

    #[tokio::test]
    async fn test_collaborator_failure_message_preserved() {
        let ws = Arc::new(InMemoryWorkspace::new());
        ws.fail_email("Gmail quota exceeded");
        let record = dispatcher(&ws)
            .execute(&ActionRequest::new(
                "c1",
                "send_email_reply",
                json!({ "threadId": "t", "to": "a@b.c", "subject": "s", "body": "b" }),
            ))
            .await;
        assert_eq!(record.status(), ActionStatus::Error);
        assert_eq!(record.error(), Some("Gmail quota exceeded"));
        assert!(record.response().is_none());
    }

    struct Slow;

    #[async_trait]
    impl Action for Slow {
        fn kind(&self) -> ActionKind {
            ActionKind::SendEmailReply
        }

        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }

        async fn execute(&self, _args: Value) -> Result<Value, AgentError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(json!({ "ok": true }))
        }
    }

    #[tokio::test]
    async fn test_timeout_reported_as_failure() {
        let mut registry = ActionRegistry::new();
        registry.register(Slow);
        let d = ActionDispatcher::new(registry, 1);
        let err = d.dispatch("send_email_reply", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Action timed out: send_email_reply");
    }
}
