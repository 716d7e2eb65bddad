//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url），使用原生 function calling：
//! 动作目录转为 tools，tool_choice=auto；响应里的 tool_calls 按原顺序转为 ActionRequest。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolArgs, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::Value;

use crate::actions::{ActionRequest, ActionSpec};
use crate::core::AgentError;
use crate::llm::{LlmClient, ModelTurn};
use crate::memory::{Message, Role};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

fn llm_err(e: OpenAIError) -> AgentError {
    AgentError::Llm(e.to_string())
}

/// OpenAI 兼容客户端：持有 Client、model 名、采样温度与单次请求超时
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    timeout: Duration,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let config = match base_url {
            Some(url) => OpenAIConfig::new().with_api_base(url).with_api_key(api_key),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature: 0.2,
            timeout: Duration::from_secs(60),
            usage: TokenUsage::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    fn to_openai_messages(&self, messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
        messages.iter().map(to_openai_message).collect()
    }
}

/// 动作请求 -> tool call；参数为原始字符串（模型给了非法 JSON）时原样回传
fn to_tool_call(request: &ActionRequest) -> ChatCompletionMessageToolCall {
    let arguments = match &request.arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    };
    ChatCompletionMessageToolCall {
        id: request.id.clone(),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: request.name.clone(),
            arguments,
        },
    }
}

fn to_openai_message(m: &Message) -> Result<ChatCompletionRequestMessage, AgentError> {
    let msg: ChatCompletionRequestMessage = match m.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(m.content.clone())
            .build()
            .map_err(llm_err)?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(m.content.clone())
            .build()
            .map_err(llm_err)?
            .into(),
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !m.content.is_empty() {
                args.content(m.content.clone());
            }
            if !m.action_requests.is_empty() {
                args.tool_calls(m.action_requests.iter().map(to_tool_call).collect::<Vec<_>>());
            }
            args.build().map_err(llm_err)?.into()
        }
        Role::Tool => ChatCompletionRequestToolMessageArgs::default()
            .content(m.content.clone())
            .tool_call_id(m.tool_call_id.clone().unwrap_or_default())
            .build()
            .map_err(llm_err)?
            .into(),
    };
    Ok(msg)
}

fn to_openai_tools(catalog: &[ActionSpec]) -> Result<Vec<ChatCompletionTool>, AgentError> {
    catalog
        .iter()
        .map(|spec| {
            let function = FunctionObjectArgs::default()
                .name(spec.name.clone())
                .description(spec.description.clone())
                .parameters(spec.parameters.clone())
                .build()
                .map_err(llm_err)?;
            ChatCompletionToolArgs::default()
                .r#type(ChatCompletionToolType::Function)
                .function(function)
                .build()
                .map_err(llm_err)
        })
        .collect()
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, messages: &[Message], catalog: &[ActionSpec]) -> Result<ModelTurn, AgentError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .temperature(self.temperature)
            .messages(self.to_openai_messages(messages)?);
        if !catalog.is_empty() {
            args.tools(to_openai_tools(catalog)?)
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }
        let request = args.build().map_err(llm_err)?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| AgentError::Llm("request timed out".to_string()))?
            .map_err(llm_err)?;

        // 提取 token 使用统计
        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AgentError::Llm("response contained no choices".to_string()))?;

        let requests: Vec<ActionRequest> = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ActionRequest::from_raw_arguments(tc.id, tc.function.name, &tc.function.arguments))
            .collect();

        if requests.is_empty() {
            Ok(ModelTurn::Reply(message.content))
        } else {
            Ok(ModelTurn::Actions {
                content: message.content,
                requests,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_keeps_raw_unparsable_arguments() {
        let req = ActionRequest::from_raw_arguments("call_1", "create_notion_task", "{broken");
        assert_eq!(to_tool_call(&req).function.arguments, "{broken");

        let req = ActionRequest::new("call_2", "create_notion_task", json!({ "title": "x" }));
        let tc = to_tool_call(&req);
        assert_eq!(tc.id, "call_2");
        assert_eq!(tc.function.arguments, r#"{"title":"x"}"#);
    }

    #[test]
    fn test_tools_built_from_catalog() {
        let catalog = vec![ActionSpec {
            name: "send_email_reply".to_string(),
            description: "Send an email reply".to_string(),
            parameters: json!({ "type": "object", "properties": {} }),
        }];
        let tools = to_openai_tools(&catalog).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "send_email_reply");
    }

    #[test]
    fn test_message_roles_convert() {
        let msgs = vec![
            Message::system("sys"),
            Message::user("hi"),
            Message::assistant_actions(
                "",
                vec![ActionRequest::new("c1", "send_email_reply", json!({}))],
            ),
            Message::tool_result("c1", r#"{"ok":true}"#),
            Message::assistant("done"),
        ];
        let converted: Vec<_> = msgs.iter().map(|m| to_openai_message(m).unwrap()).collect();
        assert!(matches!(converted[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(converted[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(converted[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(converted[3], ChatCompletionRequestMessage::Tool(_)));
        assert!(matches!(converted[4], ChatCompletionRequestMessage::Assistant(_)));
    }
}
