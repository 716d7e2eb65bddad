//! 动作层：固定动作目录、参数 schema、分发器与动作记录

pub mod executor;
pub mod handlers;
pub mod record;
pub mod registry;
pub mod schema;

pub use executor::ActionDispatcher;
pub use handlers::{CreateEventAction, CreateTaskAction, SendReplyAction, UpdateTaskStatusAction};
pub use record::{ActionRecord, ActionRequest, ActionStatus};
pub use registry::{Action, ActionKind, ActionRegistry, ActionSpec};
