//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, ModelTurn};

use crate::config::AppConfig;

/// 根据配置创建 LLM 客户端；未配置 API Key 时返回 None（AI 关闭模式）
pub fn create_llm_from_config(cfg: &AppConfig) -> Option<Arc<dyn LlmClient>> {
    if !cfg.llm_enabled() {
        tracing::warn!("OPENAI_API_KEY not configured, assistant runs in disabled mode");
        return None;
    }
    let api_key = cfg.llm.api_key.as_deref().unwrap_or_default();
    let client = OpenAiClient::new(cfg.llm.base_url.as_deref(), &cfg.llm.model, api_key)
        .with_temperature(cfg.llm.temperature)
        .with_timeout(cfg.llm.request_timeout_secs);
    tracing::info!(model = %cfg.llm.model, "LLM backend: OpenAI-compatible");
    Some(Arc::new(client))
}
