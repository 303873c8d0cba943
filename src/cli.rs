use clap::Parser;
use std::path::PathBuf;

use crate::common::config::{DEFAULT_STATUS_LIMIT, StatusConfig};
use crate::task::StatusFilter;

/// 多任务传输状态查看工具
#[derive(Parser, Debug)]
#[command(name = "mirrorstat")]
#[command(version = "0.1")]
#[command(author = "rpeng252@gmail.com")]
#[command(about = "模拟一组传输任务并输出分页状态消息", long_about = None)]
pub struct Cli {
    /// 每页显示的任务数
    #[arg(long, env = "STATUS_LIMIT", default_value_t = DEFAULT_STATUS_LIMIT)]
    pub status_limit: usize,

    /// 下载根目录（用于统计剩余空间）
    #[arg(long, env = "DOWNLOAD_DIR", value_name = "DIR", default_value = ".")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub download_dir: PathBuf,

    /// 模拟的任务数量
    #[arg(long, default_value_t = 12)]
    pub tasks: usize,

    /// 页码，越界时回绕
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,

    /// 状态过滤: All, Download, Upload, QueueDl, Seed ...
    #[arg(long, default_value = "All")]
    #[arg(value_parser = clap::value_parser!(StatusFilter))]
    pub status: StatusFilter,

    /// 只显示该用户的任务
    #[arg(long, value_name = "USER_ID")]
    pub user: Option<i64>,

    /// 以 JSON 输出导航按钮
    #[arg(long)]
    pub json: bool,

    /// 持续刷新，Ctrl-C 退出
    #[arg(long)]
    pub watch: bool,

    /// 刷新间隔（秒）
    #[arg(long, default_value_t = 2)]
    pub interval: u64,

    /// 输出调试日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn status_config(&self) -> StatusConfig {
        StatusConfig::new(self.status_limit, self.download_dir.clone())
    }
}
