pub mod freegames;

pub use freegames::{format_response, handle_command};
