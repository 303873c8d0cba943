pub mod config;
pub mod logger;
pub mod system;
pub mod utils;
