//! 快照 -> 上下文系统消息
//!
//! 三个序列原样序列化为格式化 JSON，不做摘要或截断；只暴露 data，不带 source / error。

use serde::Serialize;

use crate::dashboard::ContextSnapshot;

fn pretty<T: Serialize>(items: &[T]) -> String {
    serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string())
}

pub fn context_message(snapshot: &ContextSnapshot) -> String {
    format!(
        "Current context:\nTasks: {}\nEvents: {}\nEmails: {}",
        pretty(&snapshot.tasks.data),
        pretty(&snapshot.events.data),
        pretty(&snapshot.emails.data)
    )
}
