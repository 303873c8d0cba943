use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::{MirrorStatus, StatusFilter, Task, short_id};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("任务已存在: {0}")]
    TaskAlreadyExists(String),
}

pub type TaskHandle = Arc<dyn Task>;

/// 当前所有活动任务，按加入顺序保存
///
/// 克隆得到的是同一个注册表的句柄。锁只在复制快照时持有，
/// 渲染期间不会阻塞任务的加入与移除。
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<IndexMap<String, TaskHandle>>>, // gid -> Task
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // 添加任务，gid 重复时拒绝
    pub async fn insert(&self, task: TaskHandle) -> Result<(), RegistryError> {
        let gid = task.gid();
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&gid) {
            return Err(RegistryError::TaskAlreadyExists(gid));
        }
        debug!("任务加入注册表: {}", gid);
        tasks.insert(gid, task);
        Ok(())
    }

    // 任务结束后由其执行者移除
    pub async fn remove(&self, gid: &str) -> Option<TaskHandle> {
        let removed = self.tasks.lock().await.shift_remove(gid);
        if removed.is_some() {
            debug!("任务移出注册表: {}", gid);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }

    /// 按短 ID 查找任务
    ///
    /// 短 ID 可能重复，因此逐个比较而不是建立前缀索引，返回第一个匹配项。
    /// 支持做种的任务在比较前先刷新自身状态。
    pub async fn lookup_by_short_id(&self, gid: &str) -> Option<TaskHandle> {
        let wanted = short_id(gid);
        let tasks = self.tasks.lock().await;
        for task in tasks.values() {
            if let Some(seeding) = task.seeding() {
                seeding.refresh().await;
            }
            if task.short_id() == wanted {
                return Some(Arc::clone(task));
            }
        }
        None
    }

    // 在锁内复制出任务列表
    pub async fn snapshot(&self) -> Vec<TaskHandle> {
        self.tasks.lock().await.values().cloned().collect()
    }

    /// 按状态和提交者过滤任务，保持注册表中的顺序
    pub async fn snapshot_filtered(
        &self,
        filter: &StatusFilter,
        user_id: Option<i64>,
    ) -> Vec<TaskHandle> {
        let owned: Vec<TaskHandle> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|task| user_id.is_none_or(|uid| task.listener().user_id == uid))
            .collect();

        if *filter == StatusFilter::All {
            return owned;
        }

        let statuses: Vec<MirrorStatus> = join_all(owned.iter().map(|task| task.status())).await;
        owned
            .into_iter()
            .zip(statuses)
            .filter(|(_, status)| filter.matches(status))
            .map(|(task, _)| task)
            .collect()
    }
}
