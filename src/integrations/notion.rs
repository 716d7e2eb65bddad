//! Notion 任务库客户端
//!
//! 查询按 Status、Due 升序；属性名固定为 Name / Status / Due。每次调用前检查 API Key 与数据库 ID。

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::config::NotionSection;
use crate::core::AgentError;
use crate::integrations::{check_status, http_client, CreatedTask, NewTask, Task, TaskSource};

const NOTION_VERSION: &str = "2022-06-28";
const STATUS_PROPERTY: &str = "Status";
const NAME_PROPERTY: &str = "Name";
const DUE_PROPERTY: &str = "Due";

pub struct NotionClient {
    client: reqwest::Client,
    cfg: NotionSection,
}

impl NotionClient {
    pub fn new(cfg: NotionSection) -> Self {
        Self {
            client: http_client(cfg.timeout_secs),
            cfg,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), AgentError> {
        AgentError::require(&[
            ("NOTION_API_KEY", self.cfg.api_key.as_deref()),
            ("NOTION_DATABASE_ID", self.cfg.database_id.as_deref()),
        ])?;
        Ok((
            self.cfg.api_key.as_deref().unwrap_or_default(),
            self.cfg.database_id.as_deref().unwrap_or_default(),
        ))
    }

    fn request(&self, method: reqwest::Method, path: &str, api_key: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), path);
        self.client
            .request(method, url)
            .bearer_auth(api_key)
            .header("Notion-Version", NOTION_VERSION)
    }
}

/// 数据库查询结果中的一页 -> Task；非 page 对象（无 properties）返回 None
fn parse_task(page: &Value) -> Option<Task> {
    let properties = page.get("properties")?;
    let title = properties
        .pointer(&format!("/{NAME_PROPERTY}/title/0/plain_text"))
        .and_then(Value::as_str)
        .unwrap_or("Untitled");
    let status = properties
        .pointer(&format!("/{STATUS_PROPERTY}/status/name"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    let due = properties
        .pointer(&format!("/{DUE_PROPERTY}/date/start"))
        .and_then(Value::as_str)
        .map(String::from);
    Some(Task {
        id: page.get("id")?.as_str()?.to_string(),
        title: title.to_string(),
        status: status.to_string(),
        due,
        url: page
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// 新建页面的属性：Name 必填，Status / Due 仅在提供时写入
fn task_properties(task: &NewTask) -> Value {
    let mut properties = Map::new();
    properties.insert(
        NAME_PROPERTY.to_string(),
        json!({ "title": [{ "text": { "content": task.title } }] }),
    );
    if let Some(status) = task.status.as_deref().filter(|s| !s.is_empty()) {
        properties.insert(STATUS_PROPERTY.to_string(), json!({ "status": { "name": status } }));
    }
    if let Some(due) = task.due.as_deref().filter(|s| !s.is_empty()) {
        properties.insert(DUE_PROPERTY.to_string(), json!({ "date": { "start": due } }));
    }
    Value::Object(properties)
}

#[async_trait]
impl TaskSource for NotionClient {
    async fn fetch(&self) -> Result<Vec<Task>, AgentError> {
        let (api_key, database_id) = self.credentials()?;
        let body = json!({
            "sorts": [
                { "property": STATUS_PROPERTY, "direction": "ascending" },
                { "property": DUE_PROPERTY, "direction": "ascending" }
            ],
            "page_size": self.cfg.task_limit,
        });
        let resp = self
            .request(reqwest::Method::POST, &format!("databases/{database_id}/query"), api_key)
            .json(&body)
            .send()
            .await?;
        let data: Value = check_status(resp).await?.json().await?;
        let results = data
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| AgentError::Source("Notion query returned no results array".to_string()))?;
        Ok(results.iter().filter_map(parse_task).collect())
    }

    async fn create(&self, task: NewTask) -> Result<CreatedTask, AgentError> {
        let (api_key, database_id) = self.credentials()?;
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": task_properties(&task),
        });
        let resp = self
            .request(reqwest::Method::POST, "pages", api_key)
            .json(&body)
            .send()
            .await?;
        let page: Value = check_status(resp).await?.json().await?;
        let id = page
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::Source("Notion page response missing id".to_string()))?;
        Ok(CreatedTask {
            id: id.to_string(),
            url: page
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn update_status(&self, task_id: &str, status: &str) -> Result<(), AgentError> {
        let (api_key, _) = self.credentials()?;
        let body = json!({
            "properties": { STATUS_PROPERTY: { "status": { "name": status } } }
        });
        let resp = self
            .request(reqwest::Method::PATCH, &format!("pages/{task_id}"), api_key)
            .json(&body)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
