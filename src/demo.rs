//! 演示用的模拟引擎与任务执行者

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info, warn};

use mirror_status::bridge::engine::{
    EngineError, EngineListener, EngineNode, EngineRequest, EngineTransfer, RequestKind, TransferEngine,
    TransferState,
};
use mirror_status::bridge::listener::TransferObserver;
use mirror_status::task::queue::QueueStatus;
use mirror_status::task::registry::TaskRegistry;
use mirror_status::task::tracked::TrackedTask;
use mirror_status::task::{MirrorStatus, SubProgress, TaskListener};

const CHUNK: u64 = 4 * 1024 * 1024;

/// 在独立线程上回调监听器的模拟引擎
pub struct SimulatedEngine {
    me: Weak<SimulatedEngine>,
    listener: OnceLock<Arc<dyn EngineListener>>,
    root: EngineNode,
    cancelled: AtomicBool,
}

impl SimulatedEngine {
    pub fn new(root: EngineNode) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            listener: OnceLock::new(),
            root,
            cancelled: AtomicBool::new(false),
        })
    }

    pub fn attach(&self, listener: Arc<dyn EngineListener>) {
        if self.listener.set(listener).is_err() {
            warn!("监听器已设置，忽略");
        }
    }

    // 回调总是在另一个线程上发生
    fn callback<F>(&self, delay: Duration, f: F)
    where
        F: FnOnce(&SimulatedEngine, &dyn EngineListener) + Send + 'static,
    {
        let (Some(engine), Some(listener)) = (self.me.upgrade(), self.listener.get().cloned()) else {
            warn!("模拟引擎未就绪");
            return;
        };
        thread::spawn(move || {
            thread::sleep(delay);
            f(&engine, listener.as_ref());
        });
    }

    /// 开始下载根节点，直到完成或被取消
    pub fn start_download(&self) {
        let (Some(engine), Some(listener)) = (self.me.upgrade(), self.listener.get().cloned()) else {
            warn!("模拟引擎未就绪");
            return;
        };
        let total = self.root.size;
        let name = self.root.name.clone();
        thread::spawn(move || {
            let mut rng = rand::rng();
            let mut transferred = 0u64;
            let mut transfer = EngineTransfer {
                tag: 1,
                file_name: name,
                speed: 0,
                transferred_bytes: 0,
                total_bytes: total,
                state: TransferState::Active,
                finished: false,
                folder_transfer: false,
            };
            while transferred < total {
                thread::sleep(Duration::from_millis(250));
                let speed = rng.random_range(CHUNK..CHUNK * 4);
                transferred = (transferred + speed / 4).min(total);
                transfer.speed = speed;
                transfer.transferred_bytes = transferred;
                listener.on_transfer_update(engine.as_ref(), &transfer);
                if engine.cancelled.load(Ordering::Acquire) {
                    debug!("模拟传输已取消");
                    return;
                }
            }
            transfer.state = TransferState::Completed;
            transfer.finished = true;
            listener.on_transfer_finish(engine.as_ref(), &transfer, &EngineError::ok());
        });
    }
}

impl TransferEngine for SimulatedEngine {
    fn login(&self, email: &str, _password: &str) {
        info!("模拟登录: {}", email);
        self.callback(Duration::from_millis(100), |engine, listener| {
            listener.on_request_finish(engine, &EngineRequest::new(RequestKind::Login), &EngineError::ok());
        });
    }

    fn logout(&self) {
        self.callback(Duration::from_millis(50), |engine, listener| {
            listener.on_request_finish(engine, &EngineRequest::new(RequestKind::Logout), &EngineError::ok());
        });
    }

    fn fetch_nodes(&self) {
        self.callback(Duration::from_millis(100), |engine, listener| {
            listener.on_request_finish(engine, &EngineRequest::new(RequestKind::FetchNodes), &EngineError::ok());
        });
    }

    fn root_node(&self) -> Option<EngineNode> {
        Some(self.root.clone())
    }

    fn cancel_transfer(&self, transfer: &EngineTransfer) {
        info!("模拟引擎取消传输: {}", transfer.file_name);
        self.cancelled.store(true, Ordering::Release);
    }
}

/// 引擎下载结束后把任务移出注册表
pub struct RegistryObserver {
    pub registry: TaskRegistry,
    pub gid: String,
}

#[async_trait]
impl TransferObserver for RegistryObserver {
    async fn on_download_complete(&self) {
        info!("引擎下载完成: {}", self.gid);
        self.registry.remove(&self.gid).await;
    }

    async fn on_download_error(&self, message: String) {
        warn!("引擎下载失败: {}, 原因: {}", self.gid, message);
        self.registry.remove(&self.gid).await;
    }
}

const DEMO_NAMES: [&str; 8] = [
    "ubuntu-24.04-desktop-amd64.iso",
    "Big.Buck.Bunny.2008.1080p.mkv",
    "dataset-<2024>.tar.zst",
    "archlinux-x86_64.iso",
    "photos & videos.zip",
    "linux-6.9.tar.xz",
    "podcast_ep42.mp3",
    "backup-2024-05-01.7z",
];

const DEMO_STATUSES: [MirrorStatus; 9] = [
    MirrorStatus::Download,
    MirrorStatus::Upload,
    MirrorStatus::Seed,
    MirrorStatus::Archive,
    MirrorStatus::Extract,
    MirrorStatus::QueuedDownload,
    MirrorStatus::Split,
    MirrorStatus::Clone,
    MirrorStatus::QueuedUpload,
];

/// 创建一批模拟任务并启动执行者
pub async fn spawn_tracked_tasks(registry: &TaskRegistry, count: usize) -> anyhow::Result<()> {
    let mut rng = rand::rng();
    for i in 0..count {
        let gid = uuid::Uuid::new_v4().simple().to_string();
        let status = DEMO_STATUSES[i % DEMO_STATUSES.len()].clone();
        let total = rng.random_range(64..4096) * 1024 * 1024;
        let listener = TaskListener::new(1000 + (i % 3) as i64);
        if status == MirrorStatus::Extract {
            listener.set_sub_progress(Some(SubProgress {
                name: "part-001.bin".to_string(),
                size: total / 4,
                proceed_count: 1,
                total_items: 4,
            }));
        }

        // 排队任务不推进进度，直到被取消
        if matches!(status, MirrorStatus::QueuedDownload | MirrorStatus::QueuedUpload) {
            let name = DEMO_NAMES[i % DEMO_NAMES.len()];
            let queued = Arc::new(if status == MirrorStatus::QueuedUpload {
                QueueStatus::upload(gid.clone(), name, total, listener)
            } else {
                QueueStatus::download(gid.clone(), name, total, listener)
            });
            registry.insert(queued.clone()).await?;
            let registry = registry.clone();
            tokio::spawn(async move {
                queued.cancel_token().cancelled().await;
                registry.remove(&gid).await;
            });
            continue;
        }

        let mut task = TrackedTask::new(gid, DEMO_NAMES[i % DEMO_NAMES.len()], listener, status.clone(), total);
        if status == MirrorStatus::Seed {
            task = task.with_seeding();
        } else if status == MirrorStatus::Download {
            task = task.with_peers();
        }
        let task = Arc::new(task);
        // 重新设置一次状态以记录做种开始时间
        task.set_status(status);
        registry.insert(task.clone()).await?;
        tokio::spawn(run_tracked(registry.clone(), task, total));
    }
    Ok(())
}

// 模拟执行者：按固定节奏推进进度，完成或取消后移出注册表
async fn run_tracked(registry: TaskRegistry, task: Arc<TrackedTask>, total: u64) {
    use mirror_status::task::{SeedingTask, Task};

    let token = task.cancel_token();
    let mut interval = tokio::time::interval(Duration::from_millis(500));
    let mut processed = 0u64;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }
        let speed = rand::rng().random_range(CHUNK..CHUNK * 8);
        processed = (processed + speed / 2).min(total);
        match task.current_status() {
            MirrorStatus::Seed => {
                task.set_upload(processed, speed);
                task.set_peers(rand::rng().random_range(1..50), rand::rng().random_range(0..20));
                task.refresh().await;
            }
            _ => {
                task.set_progress(processed, speed);
                task.set_peers(rand::rng().random_range(1..50), rand::rng().random_range(0..20));
                if processed >= total {
                    break;
                }
            }
        }
    }
    registry.remove(&task.gid()).await;
}
