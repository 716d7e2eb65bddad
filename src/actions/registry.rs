//! 动作目录
//!
//! 动作集合是封闭的：ActionKind 枚举列出全部四种动作，每种动作由一个实现 Action trait 的对象负责
//! 参数校验与执行。ActionRegistry 按注册顺序保存动作，可枚举出发送给模型的 schema 目录。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::AgentError;

/// 固定的动作种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CreateNotionTask,
    UpdateNotionTaskStatus,
    CreateCalendarEvent,
    SendEmailReply,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::CreateNotionTask,
        ActionKind::UpdateNotionTaskStatus,
        ActionKind::CreateCalendarEvent,
        ActionKind::SendEmailReply,
    ];

    /// 模型看到的函数名
    pub fn name(self) -> &'static str {
        match self {
            ActionKind::CreateNotionTask => "create_notion_task",
            ActionKind::UpdateNotionTaskStatus => "update_notion_task_status",
            ActionKind::CreateCalendarEvent => "create_calendar_event",
            ActionKind::SendEmailReply => "send_email_reply",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ActionKind::CreateNotionTask => "Create a new task in the Notion task database",
            ActionKind::UpdateNotionTaskStatus => "Update the status of an existing Notion task",
            ActionKind::CreateCalendarEvent => "Create a new Google Calendar event",
            ActionKind::SendEmailReply => "Send an email reply within an existing Gmail thread",
        }
    }

    pub fn from_name(name: &str) -> Option<ActionKind> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// 发送给模型的单条函数定义
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 动作：声明参数 schema，并在执行时自行校验参数、调用外部协作者
#[async_trait]
pub trait Action: Send + Sync {
    fn kind(&self) -> ActionKind;

    /// 参数 JSON Schema（供模型生成正确的参数格式）
    fn parameters_schema(&self) -> Value;

    /// 执行动作，返回结果对象
    async fn execute(&self, args: Value) -> Result<Value, AgentError>;

    fn spec(&self) -> ActionSpec {
        let kind = self.kind();
        ActionSpec {
            name: kind.name().to_string(),
            description: kind.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// 动作注册表：每种 ActionKind 至多一个实现，按注册顺序保存
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: Vec<Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册动作；同种动作重复注册时替换旧实现
    pub fn register(&mut self, action: impl Action + 'static) {
        let kind = action.kind();
        let action: Arc<dyn Action> = Arc::new(action);
        match self.actions.iter().position(|a| a.kind() == kind) {
            Some(idx) => self.actions[idx] = action,
            None => self.actions.push(action),
        }
    }

    /// 按名查找；名字不在固定目录或未注册时返回 UnhandledAction
    pub fn get(&self, name: &str) -> Result<Arc<dyn Action>, AgentError> {
        let kind = ActionKind::from_name(name)
            .ok_or_else(|| AgentError::UnhandledAction(name.to_string()))?;
        self.actions
            .iter()
            .find(|a| a.kind() == kind)
            .cloned()
            .ok_or_else(|| AgentError::UnhandledAction(name.to_string()))
    }

    pub fn action_names(&self) -> Vec<&'static str> {
        self.actions.iter().map(|a| a.kind().name()).collect()
    }

    /// 生成发给模型的函数目录
    pub fn catalog(&self) -> Vec<ActionSpec> {
        self.actions.iter().map(|a| a.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
