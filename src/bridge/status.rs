use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::listener::AppListener;
use crate::common::utils::FormatTool;
use crate::task::{MirrorStatus, Task, TaskListener};

/// 由引擎驱动的下载任务，进度直接读取监听器的计数器
pub struct EngineTransferStatus {
    gid: String,
    name: String,
    size: u64,
    engine_listener: Arc<AppListener>,
    listener: TaskListener,
}

impl EngineTransferStatus {
    pub fn new(
        gid: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        engine_listener: Arc<AppListener>,
        listener: TaskListener,
    ) -> Self {
        Self {
            gid: gid.into(),
            name: name.into(),
            size,
            engine_listener,
            listener,
        }
    }

    fn processed(&self) -> u64 {
        self.engine_listener.downloaded_bytes().min(self.size)
    }
}

#[async_trait]
impl Task for EngineTransferStatus {
    fn gid(&self) -> String {
        self.gid.clone()
    }

    fn listener(&self) -> &TaskListener {
        &self.listener
    }

    async fn status(&self) -> MirrorStatus {
        MirrorStatus::Download
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn size(&self) -> String {
        FormatTool::format_size(self.size)
    }

    fn processed_bytes(&self) -> String {
        FormatTool::format_size(self.processed())
    }

    fn speed(&self) -> String {
        FormatTool::format_speed(self.engine_listener.speed())
    }

    fn eta(&self) -> String {
        FormatTool::format_eta(self.processed(), self.size, self.engine_listener.speed())
    }

    async fn progress(&self) -> String {
        FormatTool::format_percent(self.processed(), self.size)
    }

    async fn cancel(&self) {
        info!("取消引擎下载: {}", self.name);
        self.engine_listener.cancel_task().await;
    }
}
