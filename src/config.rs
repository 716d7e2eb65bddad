//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DESKMATE__*` 覆盖（双下划线表示嵌套，如 `DESKMATE__LLM__MODEL=gpt-4o`）。
//! 凭据类字段若仍为空，再从惯用的裸环境变量（OPENAI_API_KEY、NOTION_API_KEY 等）补齐。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub assistant: AssistantSection,
    #[serde(default)]
    pub actions: ActionsSection,
    #[serde(default)]
    pub notion: NotionSection,
    #[serde(default)]
    pub google: GoogleSection,
}

/// [app] 段：监听地址
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// [llm] 段：模型、端点、采样温度与超时；api_key 为空时进入「AI 关闭」模式
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// 偏低温度，让工具选择更稳定
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_request_timeout() -> u64 {
    60
}

/// [assistant] 段：编排循环的最大轮数
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantSection {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for AssistantSection {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

fn default_max_rounds() -> usize {
    4
}

/// [actions] 段：单次动作分发超时（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct ActionsSection {
    #[serde(default = "default_action_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ActionsSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_action_timeout_secs(),
        }
    }
}

fn default_action_timeout_secs() -> u64 {
    30
}

/// [notion] 段：任务库
#[derive(Debug, Clone, Deserialize)]
pub struct NotionSection {
    pub api_key: Option<String>,
    pub database_id: Option<String>,
    #[serde(default = "default_notion_base_url")]
    pub base_url: String,
    #[serde(default = "default_task_limit")]
    pub task_limit: usize,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotionSection {
    fn default() -> Self {
        Self {
            api_key: None,
            database_id: None,
            base_url: default_notion_base_url(),
            task_limit: default_task_limit(),
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_notion_base_url() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_task_limit() -> usize {
    10
}

fn default_http_timeout() -> u64 {
    15
}

/// [google] 段：日历与 Gmail；access_token 由外部授权流程提供
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleSection {
    pub access_token: Option<String>,
    pub calendar_id: Option<String>,
    pub gmail_user_id: Option<String>,
    #[serde(default = "default_calendar_base_url")]
    pub calendar_base_url: String,
    #[serde(default = "default_gmail_base_url")]
    pub gmail_base_url: String,
    #[serde(default = "default_google_limit")]
    pub event_limit: usize,
    #[serde(default = "default_google_limit")]
    pub email_limit: usize,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for GoogleSection {
    fn default() -> Self {
        Self {
            access_token: None,
            calendar_id: None,
            gmail_user_id: None,
            calendar_base_url: default_calendar_base_url(),
            gmail_base_url: default_gmail_base_url(),
            event_limit: default_google_limit(),
            email_limit: default_google_limit(),
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_calendar_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_gmail_base_url() -> String {
    "https://gmail.googleapis.com/gmail/v1".to_string()
}

fn default_google_limit() -> usize {
    5
}

impl AppConfig {
    /// 用裸环境变量补齐未设置的凭据字段；GMAIL_USER_ID 缺省时沿用 GOOGLE_CALENDAR_ID
    pub fn apply_env_fallbacks(mut self) -> Self {
        self.apply_fallbacks_from(|key| std::env::var(key).ok());
        self
    }

    fn apply_fallbacks_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.as_deref().map_or(true, |s| s.trim().is_empty()) {
                if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                    *slot = Some(v);
                }
            }
        }
        fill(&mut self.llm.api_key, lookup("OPENAI_API_KEY"));
        fill(&mut self.notion.api_key, lookup("NOTION_API_KEY"));
        fill(&mut self.notion.database_id, lookup("NOTION_DATABASE_ID"));
        fill(&mut self.google.access_token, lookup("GOOGLE_ACCESS_TOKEN"));
        fill(&mut self.google.calendar_id, lookup("GOOGLE_CALENDAR_ID"));
        fill(&mut self.google.gmail_user_id, lookup("GMAIL_USER_ID"));
        let calendar_id = self.google.calendar_id.clone();
        fill(&mut self.google.gmail_user_id, calendar_id);
    }

    /// LLM 是否可用（未配置 Key 时编排循环直接返回关闭提示）
    pub fn llm_enabled(&self) -> bool {
        self.llm
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

/// 从 config 目录加载配置，环境变量 DESKMATE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 DESKMATE__*（双下划线表示嵌套键）
/// 4. 最后用裸环境变量补齐凭据
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DESKMATE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    let cfg: AppConfig = c.try_deserialize()?;
    Ok(cfg.apply_env_fallbacks())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.assistant.max_rounds, 4);
        assert!((cfg.llm.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.notion.task_limit, 10);
        assert_eq!(cfg.google.event_limit, 5);
        assert_eq!(cfg.google.email_limit, 5);
        assert_eq!(cfg.actions.timeout_secs, 30);
        assert!(!cfg.llm_enabled());
    }

    #[test]
    fn test_fallbacks_fill_only_empty_fields() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-env"),
            ("NOTION_API_KEY", "secret_env"),
            ("GOOGLE_CALENDAR_ID", "team@example.com"),
        ]);
        let mut cfg = AppConfig::default();
        cfg.notion.api_key = Some("secret_file".to_string());
        cfg.apply_fallbacks_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(cfg.notion.api_key.as_deref(), Some("secret_file"));
        assert_eq!(cfg.notion.database_id, None);
        assert_eq!(cfg.google.calendar_id.as_deref(), Some("team@example.com"));
        // Gmail 用户缺省沿用日历 ID
        assert_eq!(cfg.google.gmail_user_id.as_deref(), Some("team@example.com"));
        assert!(cfg.llm_enabled());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[assistant]\nmax_rounds = 6\n\n[llm]\ntemperature = 0.5\nmodel = \"gpt-4o\"\n\n[notion]\ndatabase_id = \"db-1\""
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.assistant.max_rounds, 6);
        assert_eq!(cfg.llm.model, "gpt-4o");
        assert!((cfg.llm.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(cfg.notion.database_id.as_deref(), Some("db-1"));
        assert_eq!(cfg.actions.timeout_secs, 30);
    }
}
