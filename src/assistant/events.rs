//! 编排过程事件：供调用方流式展示轮次与动作进度

use serde::Serialize;

use crate::actions::ActionStatus;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantEvent {
    /// 进入第几轮（从 1 开始）
    RoundStarted { round: usize, max_rounds: usize },
    /// 开始执行一个动作
    ActionStarted {
        action: String,
        args: serde_json::Value,
    },
    /// 动作执行结束
    ActionFinished {
        action: String,
        status: ActionStatus,
    },
    FinalReply { text: String },
    /// 轮数用尽
    MaxRoundsReached { rounds: usize },
}

pub type EventSender = tokio::sync::mpsc::UnboundedSender<AssistantEvent>;

pub(crate) fn send_event(tx: Option<&EventSender>, ev: AssistantEvent) {
    if let Some(tx) = tx {
        // 接收端已关闭时忽略
        let _ = tx.send(ev);
    }
}
