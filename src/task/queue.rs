use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{MirrorStatus, Task, TaskListener};
use crate::common::utils::FormatTool;

/// 排队中的任务，只有名称和大小
pub struct QueueStatus {
    gid: String,
    name: String,
    size: u64,
    listener: TaskListener,
    upload: bool,
    cancel_token: CancellationToken,
}

impl QueueStatus {
    pub fn download(gid: impl Into<String>, name: impl Into<String>, size: u64, listener: TaskListener) -> Self {
        Self::new(gid, name, size, listener, false)
    }

    pub fn upload(gid: impl Into<String>, name: impl Into<String>, size: u64, listener: TaskListener) -> Self {
        Self::new(gid, name, size, listener, true)
    }

    fn new(gid: impl Into<String>, name: impl Into<String>, size: u64, listener: TaskListener, upload: bool) -> Self {
        Self {
            gid: gid.into(),
            name: name.into(),
            size,
            listener,
            upload,
            cancel_token: CancellationToken::new(),
        }
    }

    /// 排队逻辑通过该令牌得知任务已被取消
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

#[async_trait]
impl Task for QueueStatus {
    fn gid(&self) -> String {
        self.gid.clone()
    }

    fn listener(&self) -> &TaskListener {
        &self.listener
    }

    async fn status(&self) -> MirrorStatus {
        if self.upload {
            MirrorStatus::QueuedUpload
        } else {
            MirrorStatus::QueuedDownload
        }
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn size(&self) -> String {
        FormatTool::format_size(self.size)
    }

    fn processed_bytes(&self) -> String {
        "0B".to_string()
    }

    fn speed(&self) -> String {
        "0B/s".to_string()
    }

    fn eta(&self) -> String {
        "-".to_string()
    }

    async fn progress(&self) -> String {
        "0.00%".to_string()
    }

    async fn cancel(&self) {
        info!("取消排队任务: {}", self.name);
        self.cancel_token.cancel();
    }
}
