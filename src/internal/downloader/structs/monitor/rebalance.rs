//! 卡顿处理：救活空转的 worker，或者把慢区间的后半段切给空闲 worker。

use std::sync::Arc;

use tracing::{debug, info};

use crate::internal::downloader::structs::range::RangeSnapshot;
use crate::internal::downloader::structs::range_list_gen::RangeListGen;
use crate::internal::downloader::structs::worker::Worker;
use crate::internal::downloader::structs::worker_status::WorkerStatus;

use super::Monitor;

/// 受拆分锁保护的状态：定长分块模式下尚未发出的块。
#[derive(Debug)]
pub(crate) struct Rebalancer {
    range_gen: Option<RangeListGen>,
}

impl Rebalancer {
    pub(crate) fn new(range_gen: Option<RangeListGen>) -> Self {
        Self { range_gen }
    }

    pub(crate) fn next_block(&mut self) -> Option<RangeSnapshot> {
        self.range_gen.as_mut()?.gen_range()
    }

    pub(crate) fn remaining(&self) -> Option<RangeSnapshot> {
        self.range_gen.as_ref()?.remaining()
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.range_gen.as_ref().is_none_or(RangeListGen::is_exhausted)
    }
}

impl Monitor {
    /// 总速度掉到最高速度的一定比例以下、完全没有速度、或者未完成的 worker 全部失败。
    pub(crate) fn is_stalled(&self, speed: i64) -> bool {
        let mut unfinished = self
            .workers
            .iter()
            .filter(|w| !w.status().is_completed())
            .peekable();
        if unfinished.peek().is_none() {
            return false;
        }
        let all_failed = unfinished.all(|w| w.status().is_failed());
        let max = self.ctx.status.max_speeds();
        speed == 0 || (speed as f64) < max as f64 * self.settings.stall_speed_ratio || all_failed
    }

    fn idle_worker(&self) -> Option<&Arc<Worker>> {
        self.workers
            .iter()
            .find(|w| w.status() == WorkerStatus::Succeeded)
    }

    /// 定长分块模式：空闲 worker 直接领下一块。
    pub(crate) async fn refill_idle_workers(&self) {
        let mut rebalancer = self.rebalancer.lock().await;
        while let Some(idle) = self.idle_worker() {
            let Some(block) = rebalancer.next_block() else {
                break;
            };
            debug!(worker = idle.id(), range = ?block, "空闲 worker 领取新分块");
            idle.assign(block);
            idle.execute();
        }
    }

    /// 对每个未完成的 worker：能救活就重置，否则尝试把它的后半段切给空闲 worker。
    /// 同一个 worker 在一个周期内不会既被重置又被拆分。
    pub(crate) async fn rebalance(&self) {
        self.ctx.status.reset_max_speeds();
        let mut rebalancer = self.rebalancer.lock().await;

        for worker in &self.workers {
            let status = worker.status();
            if status.is_completed() || status == WorkerStatus::Paused {
                continue;
            }

            if worker.is_revivable(self.settings.reset_window) {
                info!(worker = worker.id(), ?status, idle = ?worker.idle_for(), "worker 长时间没有数据，重置连接");
                worker.reset();
                continue;
            }

            let Some(idle) = self.idle_worker() else {
                continue;
            };
            if let Some(block) = rebalancer.next_block() {
                debug!(worker = idle.id(), range = ?block, "空闲 worker 领取新分块");
                idle.assign(block);
                idle.execute();
                continue;
            }
            if !self.ctx.range_mode {
                continue;
            }
            let upper = {
                let _ledger = self.ctx.ledger_exclusive();
                let upper = worker.range().split_half(self.settings.min_parallel_size);
                if let Some(upper) = upper {
                    idle.assign(upper);
                }
                upper
            };
            if let Some(upper) = upper {
                info!(from = worker.id(), to = idle.id(), range = ?upper, "拆分慢区间");
                idle.execute();
            }
        }
    }
}
