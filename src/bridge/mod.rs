use thiserror::Error;

pub mod engine;
pub mod executor;
pub mod listener;
pub mod session;
pub mod status;
pub mod wait;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("执行器已有未完成的请求")]
    ExecutorBusy,
    #[error("引擎错误: {0}")]
    Engine(String),
    #[error("阻塞任务异常退出: {0}")]
    Join(String),
}
