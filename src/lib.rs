pub mod bridge;
pub mod cli;
pub mod common;
pub mod report;
pub mod task;
