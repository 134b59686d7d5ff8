pub mod config;
pub mod log_filter;
pub mod logger;
pub mod validation;
