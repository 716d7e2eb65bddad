//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：给定完整对话与动作目录，返回一次模型回合——
//! 要么是文本回复，要么是一批按顺序排列的动作请求。

use async_trait::async_trait;

use crate::actions::{ActionRequest, ActionSpec};
use crate::core::AgentError;
use crate::memory::Message;

/// 模型一次回合的输出
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// 终止回复；None 表示模型没有给出文本
    Reply(Option<String>),
    /// 一个或多个动作请求（按模型发出的顺序），content 为模型附带的说明文字
    Actions {
        content: Option<String>,
        requests: Vec<ActionRequest>,
    },
}

impl ModelTurn {
    /// 便于测试与 Mock 构造的简写
    pub fn reply(text: impl Into<String>) -> Self {
        ModelTurn::Reply(Some(text.into()))
    }

    pub fn actions(requests: Vec<ActionRequest>) -> Self {
        ModelTurn::Actions {
            content: None,
            requests,
        }
    }
}

/// LLM 客户端 trait：工具自动选择模式下的一次非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message], catalog: &[ActionSpec]) -> Result<ModelTurn, AgentError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
