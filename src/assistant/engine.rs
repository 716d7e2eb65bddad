//! 编排循环：模型调用与动作分发交替进行，直到模型给出文本回复或轮数用尽
//!
//! 状态：AwaitingModel -> ExecutingActions -> AwaitingModel ... -> Done。
//! 同一轮内的动作按模型发出的顺序逐个执行；单个动作失败只记入动作日志并回传给模型，
//! 不会中断本次运行。只有模型调用本身失败时返回 Err。

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use crate::actions::{ActionDispatcher, ActionRecord, ActionRequest};
use crate::assistant::events::{send_event, AssistantEvent, EventSender};
use crate::core::AgentError;
use crate::dashboard::{context_message, ContextSnapshot};
use crate::llm::{LlmClient, ModelTurn};
use crate::memory::{ConversationState, Message};

pub const SYSTEM_PROMPT: &str = "You are a meticulous executive assistant that manages the user's Notion to-do list, Google Calendar, and Gmail inbox. Take decisive actions when confident, using available tools. Always produce a concise summary of what you accomplished and anything pending.";

pub const DISABLED_MESSAGE: &str = "AI features are disabled because OPENAI_API_KEY is not configured. You can still manage your workspace manually.";

pub const NO_RESPONSE_MESSAGE: &str = "No response generated.";

pub const MAX_ROUNDS_MESSAGE: &str = "Reached maximum tool iterations without completion.";

pub const DEFAULT_MAX_ROUNDS: usize = 4;

/// 一次运行的结果：最终消息 + 按执行顺序排列的动作日志
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantOutcome {
    pub message: String,
    pub actions: Vec<ActionRecord>,
}

enum LoopPhase {
    AwaitingModel,
    ExecutingActions(Vec<ActionRequest>),
    Done(String),
}

pub struct AssistantEngine {
    llm: Option<Arc<dyn LlmClient>>,
    dispatcher: Arc<ActionDispatcher>,
    max_rounds: usize,
}

impl AssistantEngine {
    /// llm 为 None 时进入关闭模式
    pub fn new(llm: Option<Arc<dyn LlmClient>>, dispatcher: Arc<ActionDispatcher>) -> Self {
        Self {
            llm,
            dispatcher,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub fn is_enabled(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn run(&self, input: &str, snapshot: &ContextSnapshot) -> Result<AssistantOutcome, AgentError> {
        self.run_with_events(input, snapshot, None).await
    }

    /// 同 run，另外把过程事件推送到 event_tx
    pub async fn run_with_events(
        &self,
        input: &str,
        snapshot: &ContextSnapshot,
        event_tx: Option<&EventSender>,
    ) -> Result<AssistantOutcome, AgentError> {
        let Some(llm) = self.llm.as_ref() else {
            return Ok(AssistantOutcome {
                message: DISABLED_MESSAGE.to_string(),
                actions: Vec::new(),
            });
        };

        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("assistant_run", %run_id);
        self.drive(llm.as_ref(), input, snapshot, event_tx)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        llm: &dyn LlmClient,
        input: &str,
        snapshot: &ContextSnapshot,
        event_tx: Option<&EventSender>,
    ) -> Result<AssistantOutcome, AgentError> {
        let catalog = self.dispatcher.catalog();
        let mut conversation = ConversationState::new();
        conversation.push(Message::system(SYSTEM_PROMPT));
        conversation.push(Message::system(context_message(snapshot)));
        conversation.push(Message::user(input));

        let mut actions: Vec<ActionRecord> = Vec::new();
        let mut round = 0usize;
        let mut phase = LoopPhase::AwaitingModel;

        loop {
            phase = match phase {
                LoopPhase::AwaitingModel => {
                    if round >= self.max_rounds {
                        tracing::warn!(rounds = round, actions = actions.len(), "max rounds reached");
                        send_event(event_tx, AssistantEvent::MaxRoundsReached { rounds: round });
                        return Ok(AssistantOutcome {
                            message: MAX_ROUNDS_MESSAGE.to_string(),
                            actions,
                        });
                    }
                    round += 1;
                    send_event(
                        event_tx,
                        AssistantEvent::RoundStarted {
                            round,
                            max_rounds: self.max_rounds,
                        },
                    );
                    tracing::debug!(round, "invoking model");

                    match llm.complete(conversation.messages(), &catalog).await? {
                        ModelTurn::Actions { content, requests } if !requests.is_empty() => {
                            tracing::info!(round, count = requests.len(), "model requested actions");
                            conversation.push(Message::assistant_actions(
                                content.unwrap_or_default(),
                                requests.clone(),
                            ));
                            LoopPhase::ExecutingActions(requests)
                        }
                        ModelTurn::Actions { content, .. } | ModelTurn::Reply(content) => {
                            let text = content
                                .filter(|t| !t.trim().is_empty())
                                .unwrap_or_else(|| NO_RESPONSE_MESSAGE.to_string());
                            LoopPhase::Done(text)
                        }
                    }
                }
                LoopPhase::ExecutingActions(requests) => {
                    for request in &requests {
                        send_event(
                            event_tx,
                            AssistantEvent::ActionStarted {
                                action: request.name.clone(),
                                args: request.arguments.clone(),
                            },
                        );
                        let record = self.dispatcher.execute(request).await;
                        if let Some(err) = record.error() {
                            tracing::warn!(action = %request.name, error = %err, "action failed");
                        }
                        send_event(
                            event_tx,
                            AssistantEvent::ActionFinished {
                                action: request.name.clone(),
                                status: record.status(),
                            },
                        );
                        conversation.push(Message::tool_result(
                            request.id.clone(),
                            record.tool_message_content(),
                        ));
                        actions.push(record);
                    }
                    LoopPhase::AwaitingModel
                }
                LoopPhase::Done(message) => {
                    tracing::info!(rounds = round, actions = actions.len(), "assistant run finished");
                    send_event(event_tx, AssistantEvent::FinalReply { text: message.clone() });
                    return Ok(AssistantOutcome { message, actions });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionStatus;
    use crate::dashboard::SnapshotProvider;
    use crate::integrations::InMemoryWorkspace;
    use crate::llm::MockLlmClient;
    use crate::memory::Role;
    use serde_json::json;

    fn dispatcher(ws: &Arc<InMemoryWorkspace>) -> Arc<ActionDispatcher> {
        Arc::new(ActionDispatcher::standard(ws.clone(), ws.clone(), ws.clone(), 5))
    }

    async fn snapshot() -> ContextSnapshot {
        SnapshotProvider::default().get_snapshot().await
    }

    fn create_task(id: &str, title: &str) -> ActionRequest {
        ActionRequest::new(id, "create_notion_task", json!({ "title": title }))
    }

    #[tokio::test]
    async fn test_reply_without_actions_is_single_round() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let llm = Arc::new(MockLlmClient::new(vec![ModelTurn::reply("Nothing to do today.")]));
        let engine = AssistantEngine::new(Some(llm.clone()), dispatcher(&ws));

        let out = engine.run("anything urgent?", &snapshot().await).await.unwrap();
        assert_eq!(out.message, "Nothing to do today.");
        assert!(out.actions.is_empty());
        assert_eq!(llm.call_count(), 1);
        assert_eq!(ws.call_count(), 0);
    }

    #[tokio::test]
    async fn test_conversation_is_seeded_with_two_system_messages_and_input() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let llm = Arc::new(MockLlmClient::new(vec![ModelTurn::reply("ok")]));
        let engine = AssistantEngine::new(Some(llm.clone()), dispatcher(&ws));
        engine.run("plan my day", &snapshot().await).await.unwrap();

        let msgs = llm.messages_at(0).unwrap();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].role, Role::System);
        assert_eq!(msgs[0].content, SYSTEM_PROMPT);
        assert_eq!(msgs[1].role, Role::System);
        assert!(msgs[1].content.starts_with("Current context:\nTasks: "));
        assert!(msgs[1].content.contains("sample-task-1"));
        assert_eq!(msgs[2].role, Role::User);
        assert_eq!(msgs[2].content, "plan my day");
        assert_eq!(llm.catalog_at(0).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_quarterly_report_example() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let llm = Arc::new(MockLlmClient::new(vec![
            ModelTurn::actions(vec![create_task("call_1", "write the quarterly report")]),
            ModelTurn::reply("Added the task."),
        ]));
        let engine = AssistantEngine::new(Some(llm.clone()), dispatcher(&ws));

        let out = engine
            .run("add a task to write the quarterly report", &snapshot().await)
            .await
            .unwrap();
        assert_eq!(out.message, "Added the task.");
        assert_eq!(out.actions.len(), 1);
        let record = &out.actions[0];
        assert_eq!(record.action_type(), "create_notion_task");
        assert_eq!(record.status(), ActionStatus::Success);
        assert_eq!(
            record.response(),
            Some(&json!({ "id": "task-1", "url": "https://notion.local/task-1" }))
        );

        // 第二轮能看到 assistant 的动作请求与对应的 tool 结果
        let second = llm.messages_at(1).unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second[3].role, Role::Assistant);
        assert_eq!(second[3].action_requests.len(), 1);
        assert_eq!(second[4].role, Role::Tool);
        assert_eq!(second[4].tool_call_id.as_deref(), Some("call_1"));
        assert!(second[4].content.contains("task-1"));
    }

    #[tokio::test]
    async fn test_action_log_follows_emission_order_across_rounds() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let llm = Arc::new(MockLlmClient::new(vec![
            ModelTurn::actions(vec![create_task("c1", "first"), create_task("c2", "second")]),
            ModelTurn::actions(vec![ActionRequest::new(
                "c3",
                "update_notion_task_status",
                json!({ "taskId": "task-2", "status": "Done" }),
            )]),
            ModelTurn::reply("All set."),
        ]));
        let engine = AssistantEngine::new(Some(llm), dispatcher(&ws));

        let out = engine.run("do things", &snapshot().await).await.unwrap();
        let types: Vec<&str> = out.actions.iter().map(|a| a.action_type()).collect();
        assert_eq!(
            types,
            vec!["create_notion_task", "create_notion_task", "update_notion_task_status"]
        );
        assert_eq!(out.actions[0].payload()["title"], "first");
        assert_eq!(out.actions[1].payload()["title"], "second");
        // 顺序执行：第二个任务拿到 task-2，第三个动作才能更新它
        assert!(out.actions.iter().all(|a| a.is_success()));
        assert_eq!(ws.tasks()[1].status, "Done");
    }

    #[tokio::test]
    async fn test_max_rounds_returns_accumulated_log() {
        let ws = Arc::new(InMemoryWorkspace::new());
        ws.fail_email("Gmail quota exceeded");
        let llm = Arc::new(MockLlmClient::repeating(ModelTurn::actions(vec![
            create_task("c", "again"),
            ActionRequest::new(
                "r",
                "send_email_reply",
                json!({ "threadId": "t", "to": "a@b.c", "subject": "s", "body": "b" }),
            ),
        ])));
        let engine = AssistantEngine::new(Some(llm.clone()), dispatcher(&ws));
        assert_eq!(engine.max_rounds(), DEFAULT_MAX_ROUNDS);

        let out = engine.run("loop forever", &snapshot().await).await.unwrap();
        assert_eq!(out.message, MAX_ROUNDS_MESSAGE);
        assert_eq!(out.actions.len(), 8);
        assert_eq!(llm.call_count(), 4);
        let statuses: Vec<ActionStatus> = out.actions.iter().map(|a| a.status()).collect();
        for pair in statuses.chunks(2) {
            assert_eq!(pair, [ActionStatus::Success, ActionStatus::Error]);
        }
        assert_eq!(out.actions[7].error(), Some("Gmail quota exceeded"));
    }

    #[tokio::test]
    async fn test_configured_max_rounds() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let llm = Arc::new(MockLlmClient::repeating(ModelTurn::actions(vec![create_task(
            "c", "again",
        )])));
        let engine = AssistantEngine::new(Some(llm.clone()), dispatcher(&ws)).with_max_rounds(2);
        assert_eq!(engine.max_rounds(), 2);
        assert_eq!(
            AssistantEngine::new(None, dispatcher(&ws)).with_max_rounds(0).max_rounds(),
            1
        );

        let out = engine.run("loop", &snapshot().await).await.unwrap();
        assert_eq!(out.message, MAX_ROUNDS_MESSAGE);
        assert_eq!(llm.call_count(), 2);
        assert_eq!(out.actions.len(), 2);
    }

    #[tokio::test]
    async fn test_unhandled_action_recorded_and_loop_continues() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let llm = Arc::new(MockLlmClient::new(vec![
            ModelTurn::actions(vec![ActionRequest::new("c1", "archive_inbox", json!({}))]),
            ModelTurn::reply("I could not archive the inbox."),
        ]));
        let engine = AssistantEngine::new(Some(llm.clone()), dispatcher(&ws));

        let out = engine.run("archive everything", &snapshot().await).await.unwrap();
        assert_eq!(out.message, "I could not archive the inbox.");
        assert_eq!(out.actions.len(), 1);
        assert_eq!(out.actions[0].status(), ActionStatus::Error);
        assert!(out.actions[0].error().unwrap().contains("Unhandled action"));
        // 错误以 {"error": ...} 回传给模型
        let second = llm.messages_at(1).unwrap();
        let tool: serde_json::Value = serde_json::from_str(&second[4].content).unwrap();
        assert_eq!(tool["error"], "Unhandled action: archive_inbox");
        assert_eq!(ws.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_action_does_not_abort_round() {
        let ws = Arc::new(InMemoryWorkspace::new());
        ws.fail_email("Gmail quota exceeded");
        let llm = Arc::new(MockLlmClient::new(vec![
            ModelTurn::actions(vec![
                ActionRequest::new(
                    "c1",
                    "send_email_reply",
                    json!({ "threadId": "t", "to": "a@b.c", "subject": "s", "body": "b" }),
                ),
                create_task("c2", "follow up by phone"),
            ]),
            ModelTurn::reply("Email failed; created a follow-up task."),
        ]));
        let engine = AssistantEngine::new(Some(llm), dispatcher(&ws));

        let out = engine.run("reply to emma", &snapshot().await).await.unwrap();
        assert_eq!(out.actions.len(), 2);
        assert_eq!(out.actions[0].error(), Some("Gmail quota exceeded"));
        assert!(out.actions[1].is_success());
    }

    #[tokio::test]
    async fn test_empty_reply_uses_placeholder() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let llm = Arc::new(MockLlmClient::new(vec![ModelTurn::Reply(None)]));
        let engine = AssistantEngine::new(Some(llm), dispatcher(&ws));
        let out = engine.run("hi", &snapshot().await).await.unwrap();
        assert_eq!(out.message, NO_RESPONSE_MESSAGE);

        let llm = Arc::new(MockLlmClient::new(vec![ModelTurn::reply("   ")]));
        let engine = AssistantEngine::new(Some(llm), dispatcher(&ws));
        let out = engine.run("hi", &snapshot().await).await.unwrap();
        assert_eq!(out.message, NO_RESPONSE_MESSAGE);
    }

    #[tokio::test]
    async fn test_disabled_mode_makes_no_calls() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let engine = AssistantEngine::new(None, dispatcher(&ws));
        assert!(!engine.is_enabled());
        let out = engine.run("add a task", &snapshot().await).await.unwrap();
        assert_eq!(out.message, DISABLED_MESSAGE);
        assert!(out.actions.is_empty());
        assert_eq!(ws.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_is_an_error() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let llm = Arc::new(MockLlmClient::new(vec![]));
        let engine = AssistantEngine::new(Some(llm), dispatcher(&ws));
        let err = engine.run("hi", &snapshot().await).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }

    #[tokio::test]
    async fn test_progress_events() {
        let ws = Arc::new(InMemoryWorkspace::new());
        let llm = Arc::new(MockLlmClient::new(vec![
            ModelTurn::actions(vec![create_task("c1", "x")]),
            ModelTurn::reply("done"),
        ]));
        let engine = AssistantEngine::new(Some(llm), dispatcher(&ws));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        engine
            .run_with_events("go", &snapshot().await, Some(&tx))
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        assert_eq!(
            events,
            vec![
                AssistantEvent::RoundStarted { round: 1, max_rounds: 4 },
                AssistantEvent::ActionStarted {
                    action: "create_notion_task".to_string(),
                    args: json!({ "title": "x" }),
                },
                AssistantEvent::ActionFinished {
                    action: "create_notion_task".to_string(),
                    status: ActionStatus::Success,
                },
                AssistantEvent::RoundStarted { round: 2, max_rounds: 4 },
                AssistantEvent::FinalReply { text: "done".to_string() },
            ]
        );
    }
}
