//! 任务级共享计数器。

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use super::download_progress::StatusSnapshot;

/// 由 worker 累加、监控循环汇总的原子计数器。
#[derive(Debug)]
pub struct DownloadStatus {
    total_size: AtomicI64,
    downloaded: AtomicI64,
    speeds_per_second: AtomicI64,
    max_speeds: AtomicI64,
    started_at: Instant,
}

impl Default for DownloadStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadStatus {
    pub fn new() -> Self {
        Self {
            total_size: AtomicI64::new(0),
            downloaded: AtomicI64::new(0),
            speeds_per_second: AtomicI64::new(0),
            max_speeds: AtomicI64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn set_total_size(&self, total_size: i64) {
        self.total_size.store(total_size, Ordering::Release);
    }

    pub fn total_size(&self) -> i64 {
        self.total_size.load(Ordering::Acquire)
    }

    pub fn set_downloaded(&self, downloaded: i64) {
        self.downloaded.store(downloaded, Ordering::Release);
    }

    pub fn add_downloaded(&self, bytes: i64) -> i64 {
        self.downloaded.fetch_add(bytes, Ordering::AcqRel) + bytes
    }

    pub fn downloaded(&self) -> i64 {
        self.downloaded.load(Ordering::Acquire)
    }

    /// 记录本轮总速度，并刷新历史最高速度。
    pub fn record_speed(&self, speed: i64) {
        self.speeds_per_second.store(speed, Ordering::Release);
        self.max_speeds.fetch_max(speed, Ordering::AcqRel);
    }

    pub fn speeds_per_second(&self) -> i64 {
        self.speeds_per_second.load(Ordering::Acquire)
    }

    pub fn max_speeds(&self) -> i64 {
        self.max_speeds.load(Ordering::Acquire)
    }

    /// 判定卡顿后清零，重新积累基准
    pub fn reset_max_speeds(&self) {
        self.max_speeds.store(0, Ordering::Release);
    }

    pub fn time_elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            total_size: self.total_size(),
            downloaded: self.downloaded(),
            speeds_per_second: self.speeds_per_second(),
            max_speeds: self.max_speeds(),
            time_elapsed: self.time_elapsed(),
        }
    }
}
