pub mod persistence;
pub mod system;

pub use system::logger;
