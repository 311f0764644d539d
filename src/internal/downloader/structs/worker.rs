//! 单个区间的下载 worker。
//!
//! 每个 worker 固定负责一个 [`Range`]，连接的生命周期由一个 [`CancellationToken`] 控制：
//! 暂停、取消、重置都只是关掉当前连接，再视情况在同一个区间上重新连。
//! 新连接的任务会先等旧任务真正退出，保证同一区间任何时刻只有一条连接在写。

pub(crate) mod read_loop;
pub(crate) mod request;

use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::download_error::DownloadError;
use super::download_progress::WorkerSnapshot;
use super::job_context::JobContext;
use super::range::{Range, RangeSnapshot};
use super::worker_status::WorkerStatus;

/// worker 一次连接失败的结果：落到哪个状态、带着什么错误。
#[derive(Debug)]
pub(crate) struct WorkerFailure {
    pub(crate) status: WorkerStatus,
    pub(crate) error: DownloadError,
}

impl WorkerFailure {
    pub(crate) fn new(status: WorkerStatus, error: DownloadError) -> Self {
        Self { status, error }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub(crate) struct Worker {
    id: usize,
    url: String,
    range: Range,
    ctx: Arc<JobContext>,
    status: AtomicU8,
    /// 本监控周期内写入的字节数
    window_bytes: AtomicI64,
    /// 上一个监控周期算出的速度
    speed: AtomicI64,
    /// 最近一次活动，任务开始以来的毫秒数
    last_active: AtomicU64,
    last_error: Mutex<Option<DownloadError>>,
    connection: Mutex<Option<CancellationToken>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// 状态与快照
impl Worker {
    pub(crate) fn new(id: usize, url: impl Into<String>, range: RangeSnapshot, ctx: Arc<JobContext>) -> Self {
        let last_active = ctx.now_millis();
        Self {
            id,
            url: url.into(),
            range: Range::from(range),
            ctx,
            status: AtomicU8::new(WorkerStatus::Init as u8),
            window_bytes: AtomicI64::new(0),
            speed: AtomicI64::new(0),
            last_active: AtomicU64::new(last_active),
            last_error: Mutex::new(None),
            connection: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn range(&self) -> &Range {
        &self.range
    }

    pub(crate) fn status(&self) -> WorkerStatus {
        WorkerStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set_status(&self, status: WorkerStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    pub(crate) fn speed(&self) -> i64 {
        self.speed.load(Ordering::Acquire)
    }

    /// 结算本周期速度（字节/秒），计数清零。
    pub(crate) fn sample_speed(&self, elapsed: Duration) -> i64 {
        let bytes = self.window_bytes.swap(0, Ordering::AcqRel);
        let secs = elapsed.as_secs_f64();
        let speed = if secs > 0.0 {
            (bytes as f64 / secs) as i64
        } else {
            bytes
        };
        self.speed.store(speed, Ordering::Release);
        speed
    }

    pub(crate) fn record_bytes(&self, bytes: i64) {
        self.window_bytes.fetch_add(bytes, Ordering::AcqRel);
        self.touch();
    }

    pub(crate) fn touch(&self) {
        self.last_active.store(self.ctx.now_millis(), Ordering::Release);
    }

    /// 距离最近一次活动过去了多久
    pub(crate) fn idle_for(&self) -> Duration {
        let last = self.last_active.load(Ordering::Acquire);
        Duration::from_millis(self.ctx.now_millis().saturating_sub(last))
    }

    /// 速度为零、没在暂停/写盘/限流退避、且空转超过 `window`，可以重置。
    pub(crate) fn is_revivable(&self, window: Duration) -> bool {
        let status = self.status();
        let excluded = matches!(
            status,
            WorkerStatus::Paused
                | WorkerStatus::WaitingToWrite
                | WorkerStatus::TooManyConnections
                | WorkerStatus::InternalError
        ) || status.is_completed();
        !excluded && self.speed() == 0 && self.idle_for() >= window
    }

    pub(crate) fn store_error(&self, error: DownloadError) {
        *lock(&self.last_error) = Some(error);
    }

    pub(crate) fn take_last_error(&self) -> Option<DownloadError> {
        lock(&self.last_error).take()
    }

    pub(crate) fn last_error_message(&self) -> Option<String> {
        lock(&self.last_error).as_ref().map(ToString::to_string)
    }

    pub(crate) fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.id,
            url: self.url.clone(),
            status: self.status(),
            range: self.range.snapshot(),
            speed: self.speed(),
            last_error: self.last_error_message(),
        }
    }
}

/// 连接生命周期
impl Worker {
    /// 在当前区间上开一条新连接；旧连接会被关掉，新任务等旧任务退出后才开始。
    pub(crate) fn execute(self: &Arc<Self>) {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.connection).replace(token.clone()) {
            previous.cancel();
        }
        let previous_task = lock(&self.task).take();
        self.touch();

        let worker = Arc::clone(self);
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous_task {
                if let Err(e) = previous.await {
                    warn!(worker = worker.id, error = %e, "上一条连接的任务异常退出");
                    // 旧任务死在写盘途中时预留不会被归还
                    worker.range.release();
                }
            }
            worker.run(token).await;
        });
        *lock(&self.task) = Some(handle);
    }

    fn close_connection(&self) {
        if let Some(token) = lock(&self.connection).take() {
            token.cancel();
        }
    }

    pub(crate) fn pause(&self) {
        self.set_status(WorkerStatus::Paused);
        self.close_connection();
    }

    pub(crate) fn resume(self: &Arc<Self>) {
        if self.status() == WorkerStatus::Paused {
            self.set_status(WorkerStatus::Init);
            self.execute();
        }
    }

    pub(crate) fn cancel(&self) {
        self.set_status(WorkerStatus::Canceled);
        self.close_connection();
    }

    /// 关掉卡住的连接，从当前位置重连
    pub(crate) fn reset(self: &Arc<Self>) {
        self.set_status(WorkerStatus::Reset);
        self.speed.store(0, Ordering::Release);
        self.execute();
    }

    /// 给空闲 worker 换一个新区间，调用方随后 `execute()`
    pub(crate) fn assign(&self, range: RangeSnapshot) {
        self.range.assign(range);
        self.set_status(WorkerStatus::Init);
        self.speed.store(0, Ordering::Release);
        lock(&self.last_error).take();
    }

    /// 等当前连接任务退出
    pub(crate) async fn join(&self) {
        let handle = lock(&self.task).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(worker = self.id, error = %e, "连接任务异常退出");
            }
        }
    }

    async fn run(self: Arc<Self>, token: CancellationToken) {
        if token.is_cancelled() {
            return;
        }
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            outcome = self.download() => Some(outcome),
        };

        match outcome {
            None => {
                // 写到一半被取消，预留作废，下次从 begin 重新下
                self.range.release();
                debug!(worker = self.id, "连接已关闭");
            }
            Some(_) if token.is_cancelled() => {
                self.range.release();
            }
            Some(Ok(())) => {
                self.set_status(WorkerStatus::Succeeded);
                debug!(worker = self.id, range = ?self.range.snapshot(), "区间下载完成");
            }
            Some(Err(failure)) => {
                self.range.release();
                warn!(
                    worker = self.id,
                    url = %self.url,
                    status = ?failure.status,
                    error = %failure.error,
                    "区间下载中断"
                );
                self.store_error(failure.error);
                self.set_status(failure.status);
            }
        }
        self.ctx.finished.notify_one();
    }

    async fn download(&self) -> Result<(), WorkerFailure> {
        if self.ctx.range_mode && self.range.is_done() {
            return Ok(());
        }
        let response = self.connect().await?;
        self.read_body(response).await
    }
}
