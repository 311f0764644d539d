use tokio::time::Instant;
use tracing::{trace, warn};

use crate::internal::downloader::structs::download_error::DownloadError;
use crate::internal::downloader::structs::instance_state::InstanceState;

use super::Monitor;

impl Monitor {
    /// 一个监控周期。返回 `Some` 表示任务结束。
    pub(super) async fn tick(&mut self) -> Option<Result<(), DownloadError>> {
        self.persist().await;

        let speed = self.sample_speeds();
        self.publish_progress();
        trace!(
            speed,
            max_speed = self.ctx.status.max_speeds(),
            downloaded = self.ctx.status.downloaded(),
            "监控周期"
        );

        if let Some(error) = self.take_internal_error() {
            return Some(Err(error));
        }
        if self.paused {
            return None;
        }

        self.refill_idle_workers().await;
        if self.all_done().await {
            return Some(Ok(()));
        }
        if self.is_stalled(speed) {
            self.rebalance().await;
        }
        None
    }

    /// 汇总各 worker 本周期速度，更新任务级速度与最高速度。
    pub(super) fn sample_speeds(&mut self) -> i64 {
        let elapsed = self.last_sample.elapsed();
        self.last_sample = Instant::now();
        let speed = self.workers.iter().map(|w| w.sample_speed(elapsed)).sum();
        self.ctx.status.record_speed(speed);
        speed
    }

    /// 写断点，失败只记警告。
    pub(super) async fn persist(&self) {
        if let Err(e) = self.save_state().await {
            warn!(error = %e, "保存断点失败");
        }
    }

    async fn save_state(&self) -> Result<(), DownloadError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        // 拆分会同时改两个区间，持锁拍快照才不会漏掉中间那段
        let ranges = {
            let rebalancer = self.rebalancer.lock().await;
            let mut ranges: Vec<_> = self.workers.iter().map(|w| w.range().snapshot()).collect();
            ranges.extend(rebalancer.remaining());
            ranges
        };
        store
            .save(&InstanceState::new(self.ctx.status.total_size(), ranges))
            .await
    }
}
