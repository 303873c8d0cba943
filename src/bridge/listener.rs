use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use super::engine::{
    EngineError, EngineListener, EngineNode, EngineRequest, EngineTransfer, RequestKind, TransferEngine,
};
use super::wait::WaitHandle;

// 账号根节点的名称，出现时说明还没拿到真正要下载的节点
const ROOT_CONTAINER_NAME: &str = "cloud drive";

/// 接收下载完成或出错的通知，由任务的所有者实现
#[async_trait]
pub trait TransferObserver: Send + Sync {
    async fn on_download_complete(&self);
    async fn on_download_error(&self, message: String);
}

#[derive(Debug, Default)]
struct ListenerState {
    node: Option<EngineNode>,
    public_node: Option<EngineNode>,
    error: Option<String>,
    name: String,
}

/// 引擎回调的接收者
///
/// 回调发生在引擎线程上：更新计数器、记录错误，并在请求结束时发出信号
/// 唤醒等待中的 [`AsyncExecutor`](super::executor::AsyncExecutor)。
/// 完成与出错通知投递到创建时所在的 tokio 运行时。
pub struct AppListener {
    continue_event: Arc<WaitHandle>,
    observer: Arc<dyn TransferObserver>,
    runtime: Handle,
    state: Mutex<ListenerState>,
    cancelled: AtomicBool,
    bytes_transferred: AtomicU64,
    speed: AtomicU64,
}

impl AppListener {
    /// 需要在 tokio 运行时内创建
    pub fn new(continue_event: Arc<WaitHandle>, observer: Arc<dyn TransferObserver>) -> Self {
        Self::with_runtime(continue_event, observer, Handle::current())
    }

    pub fn with_runtime(continue_event: Arc<WaitHandle>, observer: Arc<dyn TransferObserver>, runtime: Handle) -> Self {
        Self {
            continue_event,
            observer,
            runtime,
            state: Mutex::new(ListenerState::default()),
            cancelled: AtomicBool::new(false),
            bytes_transferred: AtomicU64::new(0),
            speed: AtomicU64::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, ListenerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn speed(&self) -> u64 {
        self.speed.load(Ordering::Relaxed)
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.bytes_transferred.load(Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn node(&self) -> Option<EngineNode> {
        self.state().node.clone()
    }

    pub fn public_node(&self) -> Option<EngineNode> {
        self.state().public_node.clone()
    }

    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    // 只有第一次取消会返回 true
    fn mark_cancelled(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    fn notify_error(&self, message: String) {
        let observer = Arc::clone(&self.observer);
        self.runtime.spawn(async move {
            observer.on_download_error(message).await;
        });
    }

    fn notify_complete(&self) {
        let observer = Arc::clone(&self.observer);
        self.runtime.spawn(async move {
            observer.on_download_complete().await;
        });
    }

    /// 用户取消：只设置标记并通知所有者
    ///
    /// 不会发出信号，引擎下一次回调（更新或结束）时才真正中止传输。
    pub async fn cancel_task(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.observer
            .on_download_error("Download Canceled by user".to_string())
            .await;
    }
}

impl EngineListener for AppListener {
    fn on_request_finish(&self, api: &dyn TransferEngine, request: &EngineRequest, err: &EngineError) {
        if !err.is_ok() {
            if !err.is_not_found() {
                error!("引擎请求失败: {}", err);
            }
            self.state().error = Some(err.to_string());
            self.continue_event.set();
            return;
        }

        let signal = match request.kind {
            RequestKind::Login => {
                // 登录后继续拉取节点，整个流程结束后才唤醒调用方
                api.fetch_nodes();
                let state = self.state();
                state.node.is_some() && !state.name.to_lowercase().contains(ROOT_CONTAINER_NAME)
            }
            RequestKind::GetPublicNode => {
                let mut state = self.state();
                if let Some(node) = &request.public_node {
                    state.name = node.name.clone();
                }
                state.public_node = request.public_node.clone();
                true
            }
            RequestKind::FetchNodes => {
                info!("获取根节点");
                let root = api.root_node();
                let mut state = self.state();
                match root {
                    Some(node) => {
                        info!("节点名称: {}", node.name);
                        state.name = node.name.clone();
                        state.node = Some(node);
                    }
                    None => {
                        warn!("拉取节点完成但没有根节点");
                        state.error = Some("Root node not found".to_string());
                    }
                }
                true
            }
            RequestKind::Logout | RequestKind::Other(_) => true,
        };

        if signal {
            self.continue_event.set();
        }
    }

    fn on_request_temporary_error(&self, _api: &dyn TransferEngine, _request: &EngineRequest, err: &EngineError) {
        error!("引擎请求临时错误: {}", err);
        if self.mark_cancelled() {
            self.notify_error(format!("RequestTempError: {}", err));
        }
        self.state().error = Some(err.to_string());
        self.continue_event.set();
    }

    fn on_transfer_update(&self, api: &dyn TransferEngine, transfer: &EngineTransfer) {
        if self.is_cancelled() {
            api.cancel_transfer(transfer);
            self.continue_event.set();
            return;
        }
        self.speed.store(transfer.speed, Ordering::Relaxed);
        self.bytes_transferred
            .store(transfer.transferred_bytes, Ordering::Relaxed);
    }

    fn on_transfer_finish(&self, _api: &dyn TransferEngine, transfer: &EngineTransfer, _err: &EngineError) {
        if self.is_cancelled() {
            self.continue_event.set();
            return;
        }
        let matches_name = transfer.folder_transfer || transfer.file_name == self.name();
        if transfer.finished && matches_name {
            self.bytes_transferred
                .store(transfer.transferred_bytes, Ordering::Relaxed);
            self.notify_complete();
            self.continue_event.set();
        }
    }

    fn on_transfer_temporary_error(&self, _api: &dyn TransferEngine, transfer: &EngineTransfer, err: &EngineError) {
        error!("文件 {} 传输出错: {}", transfer.file_name, err);
        if transfer.state.is_transient() {
            return;
        }
        self.state().error = Some(format!("TransferTempError: {} ({})", err, transfer.file_name));
        if self.mark_cancelled() {
            self.continue_event.set();
        }
    }
}
