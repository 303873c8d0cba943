use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::common::config::StatusConfig;
use crate::common::system::{SysinfoProbe, SystemProbe};
use crate::common::utils::{FormatTool, escape_markup};
use crate::task::registry::{TaskHandle, TaskRegistry};
use crate::task::{MirrorStatus, STATUS_LABELS, StatusFilter};

pub mod buttons;
pub mod view;

use buttons::{ButtonMaker, ButtonPosition, Navigation};

// 任务数超过该值时显示页大小按钮
const PAGE_STEP_THRESHOLD: usize = 30;
// 任务数超过该值时即使未过滤也显示状态按钮
const STATUS_BUTTON_THRESHOLD: usize = 20;
const PAGE_STEPS: [usize; 7] = [1, 2, 4, 6, 8, 10, 15];
const MENU_COLUMNS: usize = 8;

/// 一次状态消息请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub requester_id: i64,
    /// 为 true 时只显示该用户自己的任务
    pub is_user: bool,
    pub page_no: i64,
    pub status: StatusFilter,
    pub page_step: usize,
}

impl ReportRequest {
    pub fn new(requester_id: i64) -> Self {
        Self {
            requester_id,
            is_user: false,
            page_no: 1,
            status: StatusFilter::All,
            page_step: 1,
        }
    }
}

/// 渲染好的状态消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub text: String,
    pub navigation: Option<Navigation>,
}

/// 分页信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page_no: usize,
    pub pages: usize,
    pub start: usize,
}

impl PageInfo {
    /// 计算页数并将页码回绕到 [1, pages]
    pub fn compute(total: usize, limit: usize, page_no: i64) -> Self {
        let limit = limit.max(1);
        let pages = total.div_ceil(limit).max(1);
        // 用 i128 计算，极端页码也不会溢出
        let page_no = ((i128::from(page_no) - 1).rem_euclid(pages as i128) + 1) as usize;
        Self {
            page_no,
            pages,
            start: (page_no - 1) * limit,
        }
    }
}

/// 根据注册表生成状态消息
pub struct StatusReporter {
    registry: TaskRegistry,
    config: StatusConfig,
    probe: Arc<dyn SystemProbe>,
    started: Instant,
}

impl StatusReporter {
    pub fn new(registry: TaskRegistry, config: StatusConfig) -> Self {
        Self::with_probe(registry, config, Arc::new(SysinfoProbe))
    }

    pub fn with_probe(registry: TaskRegistry, config: StatusConfig, probe: Arc<dyn SystemProbe>) -> Self {
        Self {
            registry,
            config,
            probe,
            started: Instant::now(),
        }
    }

    /// 生成状态消息和导航按钮
    ///
    /// 没有任何任务且未过滤时返回 `None`；过滤后为空时只返回提示文本。
    pub async fn build_report(&self, request: &ReportRequest) -> Option<StatusReport> {
        let limit = self.config.status_limit.max(1);
        let owner = request.is_user.then_some(request.requester_id);
        let tasks = self.registry.snapshot_filtered(&request.status, owner).await;
        let total = tasks.len();
        let page = PageInfo::compute(total, limit, request.page_no);

        debug!(
            "生成状态消息: 任务数 {}, 第 {}/{} 页, 过滤 {}",
            total, page.page_no, page.pages, request.status
        );

        let mut msg = String::new();
        for (offset, task) in tasks.iter().skip(page.start).take(limit).enumerate() {
            let index = page.start + offset + 1;
            self.render_task(&mut msg, index, task, &request.status).await;
        }

        if msg.is_empty() {
            return match request.status {
                StatusFilter::All => None,
                ref status => Some(StatusReport {
                    text: format!("No Active {} Tasks!\n\n", status),
                    navigation: None,
                }),
            };
        }

        let sid = request.requester_id;
        let mut buttons = ButtonMaker::new();
        if !request.is_user {
            buttons.data_button("☰", format!("status {} ov", sid), ButtonPosition::Header);
        }
        if total > limit {
            let _ = writeln!(
                msg,
                "<b>Page:</b> {}/{} | <b>Tasks:</b> {} | <b>Step:</b> {}",
                page.page_no, page.pages, total, request.page_step
            );
            buttons.data_button("<<", format!("status {} pre", sid), ButtonPosition::Header);
            buttons.data_button(">>", format!("status {} nex", sid), ButtonPosition::Header);
            if total > PAGE_STEP_THRESHOLD {
                for step in PAGE_STEPS {
                    buttons.data_button(step, format!("status {} ps {}", sid, step), ButtonPosition::Footer);
                }
            }
        }
        if request.status != StatusFilter::All || total > STATUS_BUTTON_THRESHOLD {
            for (label, value) in STATUS_LABELS {
                if value != request.status.as_str() {
                    buttons.data_button(label, format!("status {} st {}", sid, value), ButtonPosition::Body);
                }
            }
        }
        buttons.data_button("♻️", format!("status {} ref", sid), ButtonPosition::Header);

        msg.push_str(&self.footer());

        Some(StatusReport {
            text: msg,
            navigation: Some(buttons.build_menu(MENU_COLUMNS)),
        })
    }

    async fn render_task(&self, msg: &mut String, index: usize, task: &TaskHandle, filter: &StatusFilter) {
        let status = match filter {
            StatusFilter::All => task.status().await,
            StatusFilter::Only(status) => status.clone(),
        };
        let listener = task.listener();
        let sid = task.short_id();

        let status_text = match (&listener.message_link, listener.is_super_chat) {
            (Some(link), true) => format!("<a href=\"{}\">{}</a>", link, status),
            _ => status.to_string(),
        };
        let _ = write!(
            msg,
            "<b>{}.{}: </b><code>{}</code>",
            index,
            status_text,
            escape_markup(&task.name())
        );

        let sub = listener.sub_progress();
        if let Some(sub) = &sub {
            let _ = write!(msg, "\n<i>{}</i>", escape_markup(&sub.name));
        }

        let is_seed = status == MirrorStatus::Seed;
        if !is_seed && status != MirrorStatus::QueuedUpload && listener.show_progress() {
            let progress = task.progress().await;
            let (sub_size, count) = match &sub {
                Some(sub) => {
                    let total_items = if sub.total_items > 0 {
                        sub.total_items.to_string()
                    } else {
                        "?".to_string()
                    };
                    (
                        format!("/{}", FormatTool::format_size(sub.size)),
                        format!("({}/{})", sub.proceed_count, total_items),
                    )
                }
                None => (String::new(), String::new()),
            };
            let _ = write!(
                msg,
                "\n{} {}\n<b>Processed:</b> {}{} {}\n<b>Size:</b> {}\n<b>Speed:</b> {}\n<b>ETA:</b> {}",
                FormatTool::progress_bar(&progress),
                progress,
                task.processed_bytes(),
                sub_size,
                count,
                task.size(),
                task.speed(),
                task.eta()
            );
            if let Some(peers) = task.peers() {
                let _ = write!(
                    msg,
                    "\n<b>Seeders:</b> {} | <b>Leechers:</b> {}",
                    peers.seeders, peers.leechers
                );
            }
        } else if is_seed {
            match task.seeding() {
                Some(seed) => {
                    let _ = write!(
                        msg,
                        "\n<b>Size: </b>{} | <b>Speed: </b>{} | <b>Uploaded: </b>{}\n<b>Ratio: </b>{} | <b>Time: </b>{}",
                        task.size(),
                        seed.seed_speed(),
                        seed.uploaded_bytes(),
                        seed.ratio(),
                        seed.seeding_time()
                    );
                }
                // 状态为 Seed 但不支持做种统计时用占位符
                None => {
                    let _ = write!(
                        msg,
                        "\n<b>Size: </b>{} | <b>Speed: </b>? | <b>Uploaded: </b>?\n<b>Ratio: </b>? | <b>Time: </b>?",
                        task.size()
                    );
                }
            }
        } else {
            let _ = write!(msg, "\n<b>Size: </b>{}", task.size());
        }

        let cancel = if sid.contains('-') {
            format!("<code>/cancel {}</code>", sid)
        } else {
            format!("<b>/cancel_{}</b>", sid)
        };
        let _ = write!(msg, "\n<blockquote>{}</blockquote>\n\n", cancel);
    }

    fn footer(&self) -> String {
        let snapshot = self.probe.snapshot(&self.config.download_dir);
        format!(
            "<code>CPU:</code> {:.1}% | <code>FREE:</code> {}\n<code>RAM:</code> {:.1}% | <code>UPTM:</code> {}",
            snapshot.cpu_percent,
            FormatTool::format_size(snapshot.free_disk),
            snapshot.ram_percent,
            FormatTool::format_duration(self.started.elapsed().as_secs())
        )
    }
}
