//! 监控循环。
//!
//! 在调用方的任务里运行，每个周期：写断点 → 汇总速度 → 检查致命错误 →
//! 检查是否全部完成 → 卡顿时救活或拆分。控制命令与取消令牌随时打断。

pub(crate) mod rebalance;
pub(crate) mod tick;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as TokioMutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::internal::states::queue_reactive::QueueReactiveConsumer;
use crate::internal::states::unlock_reactive::UnlockReactiveProperty;

use super::control_command::ControlCommand;
use super::download_error::DownloadError;
use super::download_progress::DownloadProgress;
use super::instance_state::InstanceStateStore;
use super::job_context::JobContext;
use super::range_list_gen::RangeListGen;
use super::worker::Worker;
use super::worker_status::WorkerStatus;
use rebalance::Rebalancer;

/// 监控循环的调节参数
#[derive(Debug, Clone)]
pub(crate) struct MonitorSettings {
    pub(crate) interval: Duration,
    pub(crate) stall_speed_ratio: f64,
    pub(crate) reset_window: Duration,
    pub(crate) min_parallel_size: i64,
}

/// 形参超过 3 个，用 struct 承载
pub(crate) struct MonitorParams {
    pub(crate) workers: Vec<Arc<Worker>>,
    pub(crate) ctx: Arc<JobContext>,
    pub(crate) range_gen: Option<RangeListGen>,
    /// `None` 表示不写断点（测试模式、单连接模式）
    pub(crate) store: Option<InstanceStateStore>,
    pub(crate) progress: UnlockReactiveProperty<DownloadProgress>,
    pub(crate) settings: MonitorSettings,
}

pub(crate) struct Monitor {
    workers: Vec<Arc<Worker>>,
    ctx: Arc<JobContext>,
    /// 拆分区间、发新块、保存快照都在这把锁里做
    rebalancer: TokioMutex<Rebalancer>,
    store: Option<InstanceStateStore>,
    progress: UnlockReactiveProperty<DownloadProgress>,
    settings: MonitorSettings,
    paused: bool,
    last_sample: Instant,
}

impl Monitor {
    pub(crate) fn new(params: MonitorParams) -> Self {
        Self {
            workers: params.workers,
            ctx: params.ctx,
            rebalancer: TokioMutex::new(Rebalancer::new(params.range_gen)),
            store: params.store,
            progress: params.progress,
            settings: params.settings,
            paused: false,
            last_sample: Instant::now(),
        }
    }

    /// 启动所有 worker 并监控到结束。
    ///
    /// 出错或取消时断点文件保留，并在退出前按最新进度再写一次。
    pub(crate) async fn run(
        mut self,
        commands: &mut QueueReactiveConsumer<ControlCommand>,
        cancel: CancellationToken,
    ) -> Result<(), DownloadError> {
        for worker in &self.workers {
            worker.execute();
        }
        self.publish_progress();

        let interval = self.settings.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        let result = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break Err(DownloadError::Cancelled),

                command = commands.recv(), if commands_open => match command {
                    Some(ControlCommand::Pause) => self.pause_all(),
                    Some(ControlCommand::Resume) => self.resume_all(),
                    Some(ControlCommand::Cancel) => break Err(DownloadError::Cancelled),
                    None => commands_open = false,
                },

                _ = self.ctx.finished.notified() => {
                    if let Some(result) = self.check_finished().await {
                        break result;
                    }
                }

                _ = ticker.tick() => {
                    if let Some(result) = self.tick().await {
                        break result;
                    }
                }
            }
        };

        if let Err(error) = &result {
            info!(error = %error, "下载中止，关闭所有连接");
            self.cancel_all();
        }
        for worker in &self.workers {
            worker.join().await;
        }
        if result.is_err() {
            self.persist().await;
        }
        self.sample_speeds();
        self.publish_progress();
        result
    }

    fn pause_all(&mut self) {
        if self.paused {
            return;
        }
        info!("暂停下载");
        self.paused = true;
        for worker in &self.workers {
            let status = worker.status();
            if !status.is_completed() && status != WorkerStatus::InternalError {
                worker.pause();
            }
        }
        self.publish_progress();
    }

    fn resume_all(&mut self) {
        if !self.paused {
            return;
        }
        info!("继续下载");
        self.paused = false;
        self.last_sample = Instant::now();
        for worker in &self.workers {
            worker.resume();
        }
        self.publish_progress();
    }

    fn cancel_all(&self) {
        for worker in &self.workers {
            if !worker.status().is_completed() {
                worker.cancel();
            }
        }
    }

    /// 有 worker 写盘失败之类的致命错误时返回该错误。
    fn take_internal_error(&self) -> Option<DownloadError> {
        let failed = self
            .workers
            .iter()
            .find(|w| w.status() == WorkerStatus::InternalError)?;
        debug!(worker = failed.id(), "worker 出现致命错误");
        Some(
            failed
                .take_last_error()
                .unwrap_or_else(|| DownloadError::ChunkedInternal(format!("worker {} 内部错误", failed.id()))),
        )
    }

    /// worker 进入终态时触发：只检查致命错误、补发新块、判断是否完成。
    async fn check_finished(&mut self) -> Option<Result<(), DownloadError>> {
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
        None
    }

    async fn all_done(&self) -> bool {
        self.workers.iter().all(|w| w.status().is_completed()) && self.rebalancer.lock().await.is_exhausted()
    }

    fn publish_progress(&self) {
        let progress = {
            let _ledger = self.ctx.ledger_exclusive();
            DownloadProgress {
                status: self.ctx.status.snapshot(),
                workers: self.workers.iter().map(|w| w.snapshot()).collect(),
            }
        };
        let _ = self.progress.update(progress);
    }
}
