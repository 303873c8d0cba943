use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_STATUS_LIMIT: usize = 4;

/// 状态报告相关配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusConfig {
    /// 每页显示的任务数
    pub status_limit: usize,
    /// 下载根目录，仅用于统计剩余磁盘空间
    pub download_dir: PathBuf,
}

impl StatusConfig {
    pub fn new(status_limit: usize, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            // 页大小为 0 时无法分页
            status_limit: status_limit.max(1),
            download_dir: download_dir.into(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_LIMIT, "./downloads")
    }
}
