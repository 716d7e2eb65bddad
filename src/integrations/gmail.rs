//! Gmail 客户端
//!
//! 未读列表：先按 `in:inbox is:unread` 取 id，再并发拉取详情（保持列表顺序）。
//! 回复：拼 RFC 822 原文，base64url 编码后连同 threadId 发送。

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::future::try_join_all;
use reqwest::Url;
use serde_json::{json, Value};

use crate::config::GoogleSection;
use crate::core::AgentError;
use crate::integrations::{check_status, http_client, EmailReply, EmailSource, EmailSummary};

const UNREAD_QUERY: &str = "in:inbox is:unread";

pub struct GmailClient {
    client: reqwest::Client,
    cfg: GoogleSection,
}

impl GmailClient {
    pub fn new(cfg: GoogleSection) -> Self {
        Self {
            client: http_client(cfg.timeout_secs),
            cfg,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), AgentError> {
        AgentError::require(&[
            ("GOOGLE_ACCESS_TOKEN", self.cfg.access_token.as_deref()),
            ("GMAIL_USER_ID", self.cfg.gmail_user_id.as_deref()),
        ])?;
        Ok((
            self.cfg.access_token.as_deref().unwrap_or_default(),
            self.cfg.gmail_user_id.as_deref().unwrap_or_default(),
        ))
    }

    /// {base}/users/{user_id}/messages[/...]
    fn messages_url(&self, user_id: &str, tail: &[&str]) -> Result<Url, AgentError> {
        let mut url = Url::parse(&self.cfg.gmail_base_url)
            .map_err(|e| AgentError::Source(format!("Invalid Gmail base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| AgentError::Source("Gmail base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["users", user_id, "messages"])
            .extend(tail);
        Ok(url)
    }

    async fn message_detail(&self, token: &str, user_id: &str, id: &str) -> Result<EmailSummary, AgentError> {
        let resp = self
            .client
            .get(self.messages_url(user_id, &[id])?)
            .bearer_auth(token)
            .send()
            .await?;
        let detail: Value = check_status(resp).await?.json().await?;
        Ok(parse_message(id, &detail))
    }
}

fn header_value<'a>(detail: &'a Value, name: &str) -> Option<&'a str> {
    detail
        .pointer("/payload/headers")
        .and_then(Value::as_array)?
        .iter()
        .find(|h| {
            h.get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|h| h.get("value"))
        .and_then(Value::as_str)
}

/// internalDate 为毫秒时间戳字符串，转为 RFC 3339
fn internal_date(detail: &Value) -> Option<String> {
    let millis: i64 = detail.get("internalDate")?.as_str()?.parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn parse_message(id: &str, detail: &Value) -> EmailSummary {
    EmailSummary {
        id: id.to_string(),
        subject: header_value(detail, "subject").unwrap_or("(no subject)").to_string(),
        from: header_value(detail, "from").unwrap_or("Unknown sender").to_string(),
        snippet: detail
            .get("snippet")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        internal_date: internal_date(detail),
    }
}

/// 回复原文：To / Subject / In-Reply-To / References 头 + 空行 + 正文，base64url 无填充
fn encode_reply(reply: &EmailReply) -> String {
    let raw = [
        format!("To: {}", reply.to),
        format!("Subject: {}", reply.subject),
        format!("In-Reply-To: {}", reply.thread_id),
        format!("References: {}", reply.thread_id),
        String::new(),
        reply.body.clone(),
    ]
    .join("\n");
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

#[async_trait]
impl EmailSource for GmailClient {
    async fn list_unread(&self) -> Result<Vec<EmailSummary>, AgentError> {
        let (token, user_id) = self.credentials()?;
        let resp = self
            .client
            .get(self.messages_url(user_id, &[])?)
            .bearer_auth(token)
            .query(&[
                ("q", UNREAD_QUERY.to_string()),
                ("maxResults", self.cfg.email_limit.to_string()),
            ])
            .send()
            .await?;
        let data: Value = check_status(resp).await?.json().await?;
        let ids: Vec<&str> = data
            .get("messages")
            .and_then(Value::as_array)
            .map(|msgs| msgs.iter().filter_map(|m| m.get("id").and_then(Value::as_str)).collect())
            .unwrap_or_default();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        try_join_all(ids.into_iter().map(|id| self.message_detail(token, user_id, id))).await
    }

    async fn send_reply(&self, reply: EmailReply) -> Result<(), AgentError> {
        let (token, user_id) = self.credentials()?;
        let body = json!({
            "raw": encode_reply(&reply),
            "threadId": reply.thread_id,
        });
        let resp = self
            .client
            .post(self.messages_url(user_id, &["send"])?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
