use std::time::Duration;

use super::range::RangeSnapshot;
use super::worker_status::WorkerStatus;

/// 任务级计数器的快照。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub total_size: i64,
    pub downloaded: i64,
    pub speeds_per_second: i64,
    pub max_speeds: i64,
    pub time_elapsed: Duration,
}

/// 单个 worker 的快照。
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSnapshot {
    pub id: usize,
    pub url: String,
    pub status: WorkerStatus,
    pub range: RangeSnapshot,
    /// 最近一个监控周期的速度（字节/秒）
    pub speed: i64,
    pub last_error: Option<String>,
}

/// 下载进度：每个监控周期发布一次。
///
/// 调用方通过下载器的 `progress()` 读取或监听；进度比例可用 [`DownloadProgress::pct`] 获取。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadProgress {
    pub status: StatusSnapshot,
    pub workers: Vec<WorkerSnapshot>,
}

impl DownloadProgress {
    /// 进度百分比（0～100）；总大小为 0 或未知时返回 `f64::NAN`。
    pub fn pct(&self) -> f64 {
        Some(self.status.total_size)
            .filter(|&t| t > 0)
            .map(|t| (self.status.downloaded as f64 / t as f64) * 100.0)
            .unwrap_or(f64::NAN)
    }

    pub fn is_finished(&self) -> bool {
        self.status.total_size > 0 && self.status.downloaded >= self.status.total_size
    }
}
