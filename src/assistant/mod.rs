//! 助理编排：有界轮数的「模型 / 动作分发」交替循环与过程事件

pub mod engine;
pub mod events;

pub use engine::{
    AssistantEngine, AssistantOutcome, DEFAULT_MAX_ROUNDS, DISABLED_MESSAGE, MAX_ROUNDS_MESSAGE,
    NO_RESPONSE_MESSAGE, SYSTEM_PROMPT,
};
pub use events::{AssistantEvent, EventSender};
