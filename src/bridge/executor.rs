use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::BridgeError;
use super::wait::WaitHandle;

/// 把回调式的引擎操作变成“发起并等待”
///
/// 同一个执行器同一时间只能有一个未完成的请求，重叠调用会返回
/// [`BridgeError::ExecutorBusy`]。
#[derive(Debug, Default)]
pub struct AsyncExecutor {
    continue_event: Arc<WaitHandle>,
    busy: AtomicBool,
}

// 请求结束时释放占用标记
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AsyncExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 交给监听器的信号句柄
    pub fn continue_event(&self) -> Arc<WaitHandle> {
        Arc::clone(&self.continue_event)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// 复位信号、触发操作，然后阻塞当前线程直到监听器发出信号
    pub fn perform<F>(&self, operation: F) -> Result<(), BridgeError>
    where
        F: FnOnce(),
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BridgeError::ExecutorBusy);
        }
        let _guard = BusyGuard(&self.busy);

        self.continue_event.clear();
        operation();
        debug!("等待引擎回调");
        self.continue_event.wait();
        Ok(())
    }

    /// 在阻塞线程池中执行 [`perform`](Self::perform)，不占用异步运行时
    pub async fn perform_async<F>(self: &Arc<Self>, operation: F) -> Result<(), BridgeError>
    where
        F: FnOnce() + Send + 'static,
    {
        let executor = Arc::clone(self);
        tokio::task::spawn_blocking(move || executor.perform(operation))
            .await
            .map_err(|e| BridgeError::Join(e.to_string()))?
    }
}
