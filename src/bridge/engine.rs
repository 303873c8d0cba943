//! 外部传输引擎的接口
//!
//! 引擎在自己的线程上回调 [`EngineListener`]，与 tokio 运行时没有任何协调。

use std::fmt;

/// 引擎中的文件或文件夹节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineNode {
    pub handle: u64,
    pub name: String,
    pub size: u64,
    pub is_folder: bool,
}

/// 引擎返回的错误，`code == 0` 表示成功
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    pub const OK: i32 = 0;
    pub const NOT_FOUND: i32 = -9;

    pub fn ok() -> Self {
        Self {
            code: Self::OK,
            message: "No error".to_string(),
        }
    }

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == Self::OK
    }

    // "not found" 属于正常情况，不需要记错误日志
    pub fn is_not_found(&self) -> bool {
        self.code == Self::NOT_FOUND || self.message.eq_ignore_ascii_case("not found")
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Login,
    FetchNodes,
    GetPublicNode,
    Logout,
    Other(i32),
}

/// 一次请求的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    pub kind: RequestKind,
    pub public_node: Option<EngineNode>,
}

impl EngineRequest {
    pub fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            public_node: None,
        }
    }

    pub fn public_node(node: EngineNode) -> Self {
        Self {
            kind: RequestKind::GetPublicNode,
            public_node: Some(node),
        }
    }
}

/// 传输状态，数值与引擎保持一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    None,
    Queued,
    Active,
    Paused,
    Retrying,
    Completing,
    Completed,
    Cancelled,
    Failed,
}

impl TransferState {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => TransferState::Queued,
            2 => TransferState::Active,
            3 => TransferState::Paused,
            4 => TransferState::Retrying,
            5 => TransferState::Completing,
            6 => TransferState::Completed,
            7 => TransferState::Cancelled,
            8 => TransferState::Failed,
            _ => TransferState::None,
        }
    }

    /// 排队和重试是暂时状态，此时的错误不致命
    pub fn is_transient(&self) -> bool {
        matches!(self, TransferState::Queued | TransferState::Retrying)
    }
}

/// 某一时刻的传输信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineTransfer {
    pub tag: i32,
    pub file_name: String,
    pub speed: u64,
    pub transferred_bytes: u64,
    pub total_bytes: u64,
    pub state: TransferState,
    pub finished: bool,
    pub folder_transfer: bool,
}

/// 引擎提供的操作，调用均为非阻塞，结果通过监听器回调返回
pub trait TransferEngine: Send + Sync {
    fn login(&self, email: &str, password: &str);
    fn logout(&self);
    fn fetch_nodes(&self);
    fn root_node(&self) -> Option<EngineNode>;
    fn cancel_transfer(&self, transfer: &EngineTransfer);
}

/// 引擎回调接口
pub trait EngineListener: Send + Sync {
    fn on_request_finish(&self, api: &dyn TransferEngine, request: &EngineRequest, error: &EngineError);
    fn on_request_temporary_error(&self, api: &dyn TransferEngine, request: &EngineRequest, error: &EngineError);
    fn on_transfer_update(&self, api: &dyn TransferEngine, transfer: &EngineTransfer);
    fn on_transfer_finish(&self, api: &dyn TransferEngine, transfer: &EngineTransfer, error: &EngineError);
    fn on_transfer_temporary_error(&self, api: &dyn TransferEngine, transfer: &EngineTransfer, error: &EngineError);
}
