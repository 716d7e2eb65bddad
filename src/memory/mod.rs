//! 记忆层：单次运行的对话状态

pub mod conversation;

pub use conversation::{ConversationState, Message, Role};
