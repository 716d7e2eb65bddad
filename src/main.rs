//! Deskmate - 个人助理编排层
//!
//! 入口：初始化日志、加载配置、构造数据源客户端与编排引擎，启动 HTTP 服务。
//! 可选参数：配置文件路径（覆盖 config/default.toml 中的键）。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use deskmate::{
    actions::ActionDispatcher,
    assistant::AssistantEngine,
    config::load_config,
    dashboard::SnapshotProvider,
    integrations::{CalendarSource, EmailSource, GmailClient, GoogleCalendarClient, NotionClient, TaskSource},
    llm::create_llm_from_config,
    observability,
    server::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    // 客户端只构造一次；凭据缺失时在调用时报错，快照层会回落到示例数据
    let tasks: Arc<dyn TaskSource> = Arc::new(NotionClient::new(cfg.notion.clone()));
    let calendar: Arc<dyn CalendarSource> = Arc::new(GoogleCalendarClient::new(cfg.google.clone()));
    let email: Arc<dyn EmailSource> = Arc::new(GmailClient::new(cfg.google.clone()));

    let dispatcher = Arc::new(ActionDispatcher::standard(
        tasks.clone(),
        calendar.clone(),
        email.clone(),
        cfg.actions.timeout_secs,
    ));
    let engine = AssistantEngine::new(create_llm_from_config(&cfg), dispatcher)
        .with_max_rounds(cfg.assistant.max_rounds);
    let state = Arc::new(AppState {
        snapshots: SnapshotProvider::new(Some(tasks), Some(calendar), Some(email)),
        engine,
    });

    let listener = tokio::net::TcpListener::bind(&cfg.app.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.app.bind))?;
    tracing::info!("Deskmate listening on http://{}", cfg.app.bind);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
