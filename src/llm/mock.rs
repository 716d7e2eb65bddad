//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按脚本依次返回预设的 ModelTurn；脚本用完后返回 fallback（未设置则报错）。
//! 记录每次收到的对话与动作目录，便于断言编排循环喂给模型的内容。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::actions::ActionSpec;
use crate::core::AgentError;
use crate::llm::{LlmClient, ModelTurn};
use crate::memory::Message;

#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<ModelTurn>>,
    fallback: Option<ModelTurn>,
    calls: Mutex<Vec<Vec<Message>>>,
    catalogs: Mutex<Vec<Vec<String>>>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockLlmClient {
    pub fn new(script: Vec<ModelTurn>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// 每一轮都返回同一个回合
    pub fn repeating(turn: ModelTurn) -> Self {
        Self {
            fallback: Some(turn),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// 第 n 次调用时收到的完整对话
    pub fn messages_at(&self, call: usize) -> Option<Vec<Message>> {
        lock(&self.calls).get(call).cloned()
    }

    /// 第 n 次调用时收到的动作名目录
    pub fn catalog_at(&self, call: usize) -> Option<Vec<String>> {
        lock(&self.catalogs).get(call).cloned()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message], catalog: &[ActionSpec]) -> Result<ModelTurn, AgentError> {
        lock(&self.calls).push(messages.to_vec());
        lock(&self.catalogs).push(catalog.iter().map(|s| s.name.clone()).collect());
        let next = lock(&self.script).pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| AgentError::Llm("mock script exhausted".to_string()))
    }
}
