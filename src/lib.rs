//! Deskmate - 个人助理编排层
//!
//! 模块划分：
//! - **actions**: 固定动作目录、参数 schema、分发器与动作记录
//! - **assistant**: 有界轮数的模型 / 动作交替循环
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 统一错误类型
//! - **dashboard**: 任务 / 日程 / 邮件快照与示例数据兜底
//! - **integrations**: Notion、Google Calendar、Gmail 客户端与内存实现
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 单次运行的对话状态
//! - **observability**: 日志初始化
//! - **server**: axum HTTP 接口

pub mod actions;
pub mod assistant;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod integrations;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod server;

pub use crate::assistant::{AssistantEngine, AssistantOutcome};
pub use crate::config::{load_config, AppConfig};
pub use crate::core::AgentError;
pub use crate::dashboard::{ContextSnapshot, SnapshotProvider};
