pub mod message;

pub use message::{Message, Role, ToolCall};
