use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{MirrorStatus, PeerCounts, SeedingTask, Task, TaskListener};
use crate::common::utils::FormatTool;

/// 由普通执行者（压缩、解压、切分、做种等）驱动的任务
///
/// 计数器不加锁，读取方可能看到略旧的数据。
pub struct TrackedTask {
    gid: String,
    name: String,
    listener: TaskListener,
    status: RwLock<MirrorStatus>,
    total: AtomicU64,
    processed: AtomicU64,
    speed: AtomicU64,
    peers: Option<PeerStats>,
    seed: Option<SeedStats>,
    cancel_token: CancellationToken,
}

struct PeerStats {
    seeders: AtomicU32,
    leechers: AtomicU32,
}

struct SeedStats {
    uploaded: AtomicU64,
    upload_speed: AtomicU64,
    started: RwLock<Option<Instant>>,
    ratio_snapshot: AtomicU64, // 分享率 * 100
}

impl TrackedTask {
    pub fn new(
        gid: impl Into<String>,
        name: impl Into<String>,
        listener: TaskListener,
        status: MirrorStatus,
        total: u64,
    ) -> Self {
        Self {
            gid: gid.into(),
            name: name.into(),
            listener,
            status: RwLock::new(status),
            total: AtomicU64::new(total),
            processed: AtomicU64::new(0),
            speed: AtomicU64::new(0),
            peers: None,
            seed: None,
            cancel_token: CancellationToken::new(),
        }
    }

    // 带对端统计（种子下载）
    pub fn with_peers(mut self) -> Self {
        self.peers = Some(PeerStats {
            seeders: AtomicU32::new(0),
            leechers: AtomicU32::new(0),
        });
        self
    }

    // 支持做种
    pub fn with_seeding(mut self) -> Self {
        self.seed = Some(SeedStats {
            uploaded: AtomicU64::new(0),
            upload_speed: AtomicU64::new(0),
            started: RwLock::new(None),
            ratio_snapshot: AtomicU64::new(0),
        });
        self.with_peers()
    }

    pub fn set_status(&self, status: MirrorStatus) {
        if status == MirrorStatus::Seed {
            if let Some(seed) = &self.seed {
                let mut started = seed.started.write().unwrap_or_else(|p| p.into_inner());
                started.get_or_insert_with(Instant::now);
            }
        }
        *self.status.write().unwrap_or_else(|p| p.into_inner()) = status;
    }

    pub fn current_status(&self) -> MirrorStatus {
        self.status.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    // 已处理字节数不会超过总大小
    pub fn set_progress(&self, processed: u64, speed: u64) {
        let total = self.total.load(Ordering::Relaxed);
        let processed = if total > 0 { processed.min(total) } else { processed };
        self.processed.store(processed, Ordering::Relaxed);
        self.speed.store(speed, Ordering::Relaxed);
    }

    pub fn set_peers(&self, seeders: u32, leechers: u32) {
        if let Some(peers) = &self.peers {
            peers.seeders.store(seeders, Ordering::Relaxed);
            peers.leechers.store(leechers, Ordering::Relaxed);
        }
    }

    pub fn set_upload(&self, uploaded: u64, upload_speed: u64) {
        if let Some(seed) = &self.seed {
            seed.uploaded.store(uploaded, Ordering::Relaxed);
            seed.upload_speed.store(upload_speed, Ordering::Relaxed);
        }
    }

    /// 执行者通过该令牌感知取消
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

#[async_trait]
impl Task for TrackedTask {
    fn gid(&self) -> String {
        self.gid.clone()
    }

    fn listener(&self) -> &TaskListener {
        &self.listener
    }

    async fn status(&self) -> MirrorStatus {
        self.current_status()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn size(&self) -> String {
        FormatTool::format_size(self.total.load(Ordering::Relaxed))
    }

    fn processed_bytes(&self) -> String {
        FormatTool::format_size(self.processed.load(Ordering::Relaxed))
    }

    fn speed(&self) -> String {
        FormatTool::format_speed(self.speed.load(Ordering::Relaxed))
    }

    fn eta(&self) -> String {
        FormatTool::format_eta(
            self.processed.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
            self.speed.load(Ordering::Relaxed),
        )
    }

    async fn progress(&self) -> String {
        FormatTool::format_percent(
            self.processed.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }

    fn peers(&self) -> Option<PeerCounts> {
        self.peers.as_ref().map(|p| PeerCounts {
            seeders: p.seeders.load(Ordering::Relaxed),
            leechers: p.leechers.load(Ordering::Relaxed),
        })
    }

    fn seeding(&self) -> Option<&dyn SeedingTask> {
        if self.seed.is_some() {
            Some(self as &dyn SeedingTask)
        } else {
            None
        }
    }

    async fn cancel(&self) {
        info!("取消任务: {} ({})", self.name, self.gid);
        self.cancel_token.cancel();
    }
}

#[async_trait]
impl SeedingTask for TrackedTask {
    // 按当前上传量重新计算分享率
    async fn refresh(&self) {
        if let Some(seed) = &self.seed {
            let total = self.total.load(Ordering::Relaxed);
            let uploaded = seed.uploaded.load(Ordering::Relaxed);
            let ratio = if total > 0 { uploaded * 100 / total } else { 0 };
            seed.ratio_snapshot.store(ratio, Ordering::Relaxed);
        }
    }

    fn seed_speed(&self) -> String {
        let speed = self
            .seed
            .as_ref()
            .map(|s| s.upload_speed.load(Ordering::Relaxed))
            .unwrap_or(0);
        FormatTool::format_speed(speed)
    }

    fn uploaded_bytes(&self) -> String {
        let uploaded = self
            .seed
            .as_ref()
            .map(|s| s.uploaded.load(Ordering::Relaxed))
            .unwrap_or(0);
        FormatTool::format_size(uploaded)
    }

    fn ratio(&self) -> String {
        let ratio = self
            .seed
            .as_ref()
            .map(|s| s.ratio_snapshot.load(Ordering::Relaxed))
            .unwrap_or(0);
        format!("{:.2}", ratio as f64 / 100.0)
    }

    fn seeding_time(&self) -> String {
        let elapsed = self
            .seed
            .as_ref()
            .and_then(|s| *s.started.read().unwrap_or_else(|p| p.into_inner()))
            .map(|started| started.elapsed().as_secs())
            .unwrap_or(0);
        FormatTool::format_duration(elapsed)
    }
}
