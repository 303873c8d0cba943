use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod queue;
pub mod registry;
pub mod tracked;

/// 短 ID 长度
pub const SHORT_ID_LEN: usize = 8;

/// 任务状态，未知的旧状态保存在 `Unclassified` 中，过滤时归入 Download
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorStatus {
    Upload,
    Download,
    Clone,
    QueuedDownload,
    QueuedUpload,
    Paused,
    Archive,
    Extract,
    Split,
    CheckUp,
    Seed,
    SameVideo,
    Convert,
    FFmpeg,
    Unclassified(String),
}

impl MirrorStatus {
    pub const KNOWN: [MirrorStatus; 14] = [
        MirrorStatus::Upload,
        MirrorStatus::Download,
        MirrorStatus::Clone,
        MirrorStatus::QueuedDownload,
        MirrorStatus::QueuedUpload,
        MirrorStatus::Paused,
        MirrorStatus::Archive,
        MirrorStatus::Extract,
        MirrorStatus::Split,
        MirrorStatus::CheckUp,
        MirrorStatus::Seed,
        MirrorStatus::SameVideo,
        MirrorStatus::Convert,
        MirrorStatus::FFmpeg,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            MirrorStatus::Upload => "Upload",
            MirrorStatus::Download => "Download",
            MirrorStatus::Clone => "Clone",
            MirrorStatus::QueuedDownload => "QueueDl",
            MirrorStatus::QueuedUpload => "QueueUp",
            MirrorStatus::Paused => "Pause",
            MirrorStatus::Archive => "Archive",
            MirrorStatus::Extract => "Extract",
            MirrorStatus::Split => "Split",
            MirrorStatus::CheckUp => "CheckUp",
            MirrorStatus::Seed => "Seed",
            MirrorStatus::SameVideo => "SamVid",
            MirrorStatus::Convert => "Convert",
            MirrorStatus::FFmpeg => "FFmpeg",
            MirrorStatus::Unclassified(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, MirrorStatus::Unclassified(_))
    }

    // 未知状态按 Download 处理
    pub fn bucket(&self) -> MirrorStatus {
        if self.is_known() {
            self.clone()
        } else {
            MirrorStatus::Download
        }
    }
}

impl fmt::Display for MirrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MirrorStatus {
    fn from(value: &str) -> Self {
        MirrorStatus::KNOWN
            .iter()
            .find(|s| s.as_str() == value)
            .cloned()
            .unwrap_or_else(|| MirrorStatus::Unclassified(value.to_string()))
    }
}

/// 状态过滤条件，`All` 表示不过滤
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(MirrorStatus),
}

impl StatusFilter {
    pub fn as_str(&self) -> &str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Only(status) => status.as_str(),
        }
    }

    // 判断某个任务状态是否命中过滤条件
    pub fn matches(&self, status: &MirrorStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => {
                status == wanted
                    || (*wanted == MirrorStatus::Download && !status.is_known())
            }
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "All" {
            return Ok(StatusFilter::All);
        }
        match MirrorStatus::from(s) {
            MirrorStatus::Unclassified(raw) => Err(format!("未知的状态: {}", raw)),
            status => Ok(StatusFilter::Only(status)),
        }
    }
}

/// 状态按钮的短标签，顺序即按钮顺序
pub const STATUS_LABELS: [(&str, &str); 15] = [
    ("ALL", "All"),
    ("DL", "Download"),
    ("UP", "Upload"),
    ("QD", "QueueDl"),
    ("QU", "QueueUp"),
    ("AR", "Archive"),
    ("EX", "Extract"),
    ("SD", "Seed"),
    ("CL", "Clone"),
    ("CM", "Convert"),
    ("SP", "Split"),
    ("SV", "SamVid"),
    ("FF", "FFmpeg"),
    ("PA", "Pause"),
    ("CK", "CheckUp"),
];

/// 子任务进度（例如压缩包内逐个文件处理）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubProgress {
    pub name: String,
    pub size: u64,
    pub proceed_count: usize,
    pub total_items: usize,
}

/// 任务的提交者信息
#[derive(Debug)]
pub struct TaskListener {
    pub user_id: i64,
    pub message_link: Option<String>,
    pub is_super_chat: bool,
    show_progress: AtomicBool,
    sub: RwLock<Option<SubProgress>>,
}

impl TaskListener {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            message_link: None,
            is_super_chat: false,
            show_progress: AtomicBool::new(true),
            sub: RwLock::new(None),
        }
    }

    // 超级群组中的消息可以带链接
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.message_link = Some(link.into());
        self.is_super_chat = true;
        self
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress.load(Ordering::Relaxed)
    }

    pub fn set_show_progress(&self, show: bool) {
        self.show_progress.store(show, Ordering::Relaxed);
    }

    pub fn sub_progress(&self) -> Option<SubProgress> {
        match self.sub.read() {
            Ok(sub) => sub.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_sub_progress(&self, sub: Option<SubProgress>) {
        match self.sub.write() {
            Ok(mut guard) => *guard = sub,
            Err(poisoned) => *poisoned.into_inner() = sub,
        }
    }
}

/// 做种任务的对端数量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeerCounts {
    pub seeders: u32,
    pub leechers: u32,
}

/// 支持做种的任务额外提供的能力
#[async_trait]
pub trait SeedingTask: Send + Sync {
    /// 查询前先同步一次内部状态
    async fn refresh(&self);
    fn seed_speed(&self) -> String;
    fn uploaded_bytes(&self) -> String;
    fn ratio(&self) -> String;
    fn seeding_time(&self) -> String;
}

/// 状态报告中可展示的任务
///
/// 大小、速度等返回已格式化的字符串；状态与进度统一为异步接口，
/// 纯同步的实现直接返回即可。
#[async_trait]
pub trait Task: Send + Sync {
    fn gid(&self) -> String;
    fn listener(&self) -> &TaskListener;
    async fn status(&self) -> MirrorStatus;
    fn name(&self) -> String;
    fn size(&self) -> String;
    fn processed_bytes(&self) -> String;
    fn speed(&self) -> String;
    fn eta(&self) -> String;
    async fn progress(&self) -> String;

    fn peers(&self) -> Option<PeerCounts> {
        None
    }

    fn seeding(&self) -> Option<&dyn SeedingTask> {
        None
    }

    async fn cancel(&self);

    fn short_id(&self) -> String {
        short_id(&self.gid())
    }
}

/// 取前 8 个字符作为短 ID
pub fn short_id(gid: &str) -> String {
    gid.chars().take(SHORT_ID_LEN).collect()
}
