use std::path::Path;
use std::sync::{Mutex, OnceLock};

use sysinfo::{Disks, System};
use tracing::warn;

/// 状态消息页脚中的系统信息
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SystemSnapshot {
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub free_disk: u64,
}

/// 系统信息来源，测试时可替换为固定值
pub trait SystemProbe: Send + Sync {
    fn snapshot(&self, download_dir: &Path) -> SystemSnapshot;
}

#[derive(Debug, Default)]
pub struct SysinfoProbe;

static SYSTEM: OnceLock<Mutex<System>> = OnceLock::new();

fn get_system() -> &'static Mutex<System> {
    SYSTEM.get_or_init(|| {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Mutex::new(sys)
    })
}

impl SystemProbe for SysinfoProbe {
    fn snapshot(&self, download_dir: &Path) -> SystemSnapshot {
        let (cpu_percent, ram_percent) = {
            let mut sys = match get_system().lock() {
                Ok(sys) => sys,
                Err(poisoned) => {
                    warn!("系统信息锁已中毒，继续使用旧数据");
                    poisoned.into_inner()
                }
            };
            sys.refresh_cpu_usage();
            sys.refresh_memory();

            let total = sys.total_memory();
            let ram = if total > 0 {
                sys.used_memory() as f32 * 100.0 / total as f32
            } else {
                0.0
            };
            (sys.global_cpu_usage(), ram)
        };

        SystemSnapshot {
            cpu_percent,
            ram_percent,
            free_disk: free_space(download_dir),
        }
    }
}

// 找到挂载点最长匹配下载目录的磁盘
fn free_space(download_dir: &Path) -> u64 {
    let target = download_dir
        .canonicalize()
        .unwrap_or_else(|_| download_dir.to_path_buf());
    let disks = Disks::new_with_refreshed_list();

    disks
        .list()
        .iter()
        .filter(|disk| target.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
        .unwrap_or(0)
}
