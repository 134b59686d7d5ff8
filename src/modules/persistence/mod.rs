pub mod context;

pub use context::{context_file_name, BotContext};
