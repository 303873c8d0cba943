use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// 跨线程的单槽信号
///
/// `set` 可重复调用；`wait` 阻塞到被设置为止，下一次请求前由 `clear` 复位。
#[derive(Debug, Default)]
pub struct WaitHandle {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl WaitHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.signaled.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set(&self) {
        let mut signaled = self.lock();
        *signaled = true;
        self.condvar.notify_all();
    }

    pub fn clear(&self) {
        *self.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    pub fn wait(&self) {
        let mut signaled = self.lock();
        while !*signaled {
            signaled = self.condvar.wait(signaled).unwrap_or_else(|p| p.into_inner());
        }
    }

    /// 超时返回 false；只供调用方自行实现超时时使用
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let signaled = self.lock();
        let (signaled, _) = self
            .condvar
            .wait_timeout_while(signaled, timeout, |s| !*s)
            .unwrap_or_else(|p| p.into_inner());
        *signaled
    }
}
