//! 一次任务内所有 worker 共享的资源。

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::Notify;

use crate::internal::downloader::traits::status_decoder::StatusDecoder;

use super::cache_pool::CachePool;
use super::download_status::DownloadStatus;
use super::rate_limiter::RateLimiter;
use super::writer::Writer;

pub(crate) struct JobContext {
    pub(crate) client: Client,
    /// 测试模式下为 `None`
    pub(crate) writer: Option<Arc<Writer>>,
    pub(crate) status: Arc<DownloadStatus>,
    pub(crate) cache_pool: CachePool,
    pub(crate) rate_limiter: Option<RateLimiter>,
    pub(crate) decoder: Arc<dyn StatusDecoder>,
    /// 服务器支持 Range；为 `false` 时只有一个 worker 顺序读完整个响应
    pub(crate) range_mode: bool,
    pub(crate) throttle_base_delay: Duration,
    /// worker 进入终态时通知监控循环
    pub(crate) finished: Notify,
    /// 提交进度、拆分区间持读/写锁；拍进度快照时持写锁，保证 已下载 + 剩余区间 = 总大小
    ledger: RwLock<()>,
    epoch: Instant,
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("range_mode", &self.range_mode)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// 形参超过 3 个，用 struct 承载
pub(crate) struct JobContextParams {
    pub(crate) client: Client,
    pub(crate) writer: Option<Arc<Writer>>,
    pub(crate) status: Arc<DownloadStatus>,
    pub(crate) cache_size: usize,
    pub(crate) max_idle_buffers: usize,
    pub(crate) rate_limit: Option<u64>,
    pub(crate) decoder: Arc<dyn StatusDecoder>,
    pub(crate) range_mode: bool,
    pub(crate) throttle_base_delay: Duration,
}

impl JobContext {
    pub(crate) fn new(params: JobContextParams) -> Self {
        Self {
            client: params.client,
            writer: params.writer,
            status: params.status,
            cache_pool: CachePool::new(params.cache_size, params.max_idle_buffers),
            rate_limiter: params.rate_limit.map(RateLimiter::new),
            decoder: params.decoder,
            range_mode: params.range_mode,
            throttle_base_delay: params.throttle_base_delay,
            finished: Notify::new(),
            ledger: RwLock::new(()),
            epoch: Instant::now(),
        }
    }

    /// 任务开始以来的毫秒数，worker 用它记录最近一次活动时间
    pub(crate) fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// worker 提交写入时持有，互相之间不阻塞
    pub(crate) fn ledger_shared(&self) -> RwLockReadGuard<'_, ()> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 拆分区间、拍快照时持有
    pub(crate) fn ledger_exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }
}
