//! 下载器：探测、规划、组装 worker 与监控循环。

pub(crate) mod mirrors;
pub mod plan;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::internal::downloader::impl_traits::impl_probe::GetProbe;
use crate::internal::downloader::impl_traits::impl_status_decoder::PlainStatusDecoder;
use crate::internal::downloader::traits::probe::Probe;
use crate::internal::downloader::traits::status_decoder::StatusDecoder;
use crate::internal::downloader::traits::writer_at::WriterAt;
use crate::internal::states::queue_reactive::QueueReactiveConsumer;
use crate::internal::states::unlock_reactive::UnlockReactiveProperty;

use super::control_command::ControlCommand;
use super::download_error::DownloadError;
use super::download_progress::DownloadProgress;
use super::download_status::DownloadStatus;
use super::downloader_config::{BlockSizeMode, DownloaderConfig};
use super::downloader_controller::DownloaderController;
use super::instance_state::{InstanceState, InstanceStateStore};
use super::job_context::{JobContext, JobContextParams};
use super::load_balancer::LoadBalancer;
use super::monitor::{Monitor, MonitorParams, MonitorSettings};
use super::range::RangeSnapshot;
use super::range_list_gen::RangeListGen;
use super::worker::Worker;
use super::writer::Writer;
use plan::TransferPlan;

/// 并行可续传下载器。一个实例只下载一次，`send()` 消费自身。
///
/// ```ignore
/// let writer = MemoryWriter::new();
/// let downloader = Downloader::new(client, url)
///     .max_parallel(4)
///     .instance_state_path("a.bin.downloading")
///     .with_writer(writer.clone());
/// let controller = downloader.get_controller();
/// downloader.send().await?;
/// ```
pub struct Downloader {
    client: Client,
    url: String,
    mirrors: Vec<String>,
    config: DownloaderConfig,
    writer: Option<Box<dyn WriterAt>>,
    probe: Arc<dyn Probe>,
    decoder: Arc<dyn StatusDecoder>,
    progress: UnlockReactiveProperty<DownloadProgress>,
    /// 命令通过无锁队列发送，控制器可以随意共享
    controller: Arc<DownloaderController>,
    command_consumer: QueueReactiveConsumer<ControlCommand>,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("url", &self.url)
            .field("mirrors", &self.mirrors)
            .field("config", &self.config)
            .field("has_writer", &self.writer.is_some())
            .finish_non_exhaustive()
    }
}

/// 构造与配置
impl Downloader {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        let (controller, command_consumer) = DownloaderController::new(CancellationToken::new());
        Self {
            client,
            url: url.into(),
            mirrors: Vec::new(),
            config: DownloaderConfig::default(),
            writer: None,
            probe: Arc::new(GetProbe),
            decoder: Arc::new(PlainStatusDecoder),
            progress: UnlockReactiveProperty::new(DownloadProgress::default()),
            controller: Arc::new(controller),
            command_consumer,
        }
    }

    /// 整体替换配置
    pub fn with_config(mut self, config: DownloaderConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置最大并发数
    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.config.max_parallel = max_parallel.max(1);
        self
    }

    /// 设置每个 worker 的读缓存大小（字节）
    pub fn cache_size(mut self, cache_size: usize) -> Self {
        self.config.cache_size = cache_size;
        self
    }

    pub fn block_size(mut self, mode: BlockSizeMode) -> Self {
        self.config.block_size = mode;
        self
    }

    /// 限速（字节/秒）
    pub fn rate_limit(mut self, bytes_per_second: u64) -> Self {
        self.config.rate_limit = Some(bytes_per_second);
        self
    }

    /// 断点文件路径，一般为 `<保存路径>.downloading`
    pub fn instance_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.instance_state_path = Some(path.into());
        self
    }

    /// 测试模式：只下载不落盘，也不写断点
    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.config.test_mode = test_mode;
        self
    }

    pub fn min_parallel_size(mut self, size: i64) -> Self {
        self.config.min_parallel_size = size.max(1);
        self
    }

    pub fn monitor_interval(mut self, interval: Duration) -> Self {
        self.config.monitor_interval = interval;
        self
    }

    pub fn stall_speed_ratio(mut self, ratio: f64) -> Self {
        self.config.stall_speed_ratio = ratio;
        self
    }

    pub fn reset_window(mut self, window: Duration) -> Self {
        self.config.reset_window = window;
        self
    }

    pub fn throttle_base_delay(mut self, delay: Duration) -> Self {
        self.config.throttle_base_delay = delay;
        self
    }

    pub fn mirror_probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.mirror_probe_timeout = timeout;
        self
    }

    /// 备用镜像，需与主链接大小一致才会被使用
    pub fn with_mirrors(mut self, mirrors: Vec<String>) -> Self {
        self.mirrors = mirrors;
        self
    }

    pub fn with_probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn with_status_decoder(mut self, decoder: impl StatusDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn with_writer(mut self, writer: impl WriterAt + 'static) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn get_controller(&self) -> Arc<DownloaderController> {
        Arc::clone(&self.controller)
    }

    /// 下载进度，每个监控周期更新一次
    pub fn progress(&self) -> UnlockReactiveProperty<DownloadProgress> {
        self.progress.clone()
    }
}

/// 下载流程
impl Downloader {
    /// 执行下载。成功后刷新输出并删除断点文件；失败或取消时断点保留。
    pub async fn send(mut self) -> Result<(), DownloadError> {
        let test_mode = self.config.test_mode;
        let sink = match (self.writer.take(), test_mode) {
            (_, true) => None,
            (Some(sink), false) => Some(sink),
            (None, false) => return Err(DownloadError::NoDestination),
        };

        let mut info = self.probe.probe(&self.client, &self.url).await?;
        if !info.is_success() {
            return Err(info.into_error(self.decoder.as_ref()).await);
        }
        info.discard_body();
        let total_size = info.content_length;
        debug!(url = %self.url, ?total_size, accept_ranges = info.accept_ranges, "探测完成");

        let mirrors = if self.mirrors.is_empty() {
            Vec::new()
        } else {
            self.verify_mirrors(&info).await
        };
        let balancer = LoadBalancer::new(self.url.clone(), mirrors);

        let store = match (&self.config.instance_state_path, test_mode) {
            (Some(path), false) => Some(InstanceStateStore::new(path.clone())),
            _ => None,
        };
        let resumed = match (&store, total_size, info.accept_ranges) {
            (Some(store), Some(total), true) => Self::load_resumable(store, total).await,
            _ => None,
        };
        let pending = resumed.as_ref().map(InstanceState::pending_ranges);

        let plan = TransferPlan::compute(
            &self.config,
            total_size,
            info.accept_ranges,
            pending.as_ref().map(Vec::len),
        );
        self.config.plan = Some(plan);
        info!(
            url = %self.url,
            ?total_size,
            parallel = plan.parallel,
            block_size = plan.block_size,
            cache_size = plan.cache_size,
            range_mode = plan.range_mode,
            resumed = resumed.is_some(),
            "下载计划"
        );

        let status = Arc::new(DownloadStatus::new());
        status.set_total_size(total_size.unwrap_or(0));
        if let Some(state) = &resumed {
            status.set_downloaded(state.downloaded());
        }

        let writer = sink.map(|sink| Arc::new(Writer::new(sink)));

        let nothing_left = total_size == Some(0) || pending.as_ref().is_some_and(Vec::is_empty);
        if nothing_left {
            info!(url = %self.url, "没有需要下载的数据");
            let _ = self.progress.update(DownloadProgress {
                status: status.snapshot(),
                workers: Vec::new(),
            });
            return Self::finish(writer.as_deref(), store.as_ref()).await;
        }

        let (ranges, range_gen) = Self::initial_ranges(&plan, total_size, pending);

        if let (Some(writer), Some(total)) = (&writer, total_size) {
            if let Err(e) = writer.preallocate(total).await {
                warn!(error = %e, "预分配文件空间失败，继续下载");
            }
        }

        let ctx = Arc::new(JobContext::new(JobContextParams {
            client: self.client.clone(),
            writer: writer.clone(),
            status,
            cache_size: plan.cache_size,
            max_idle_buffers: plan.parallel,
            rate_limit: self.config.rate_limit,
            decoder: Arc::clone(&self.decoder),
            range_mode: plan.range_mode,
            throttle_base_delay: self.config.throttle_base_delay,
        }));

        let workers: Vec<Arc<Worker>> = ranges
            .into_iter()
            .enumerate()
            .map(|(id, range)| Arc::new(Worker::new(id, balancer.next_url(), range, Arc::clone(&ctx))))
            .collect();

        let monitor = Monitor::new(MonitorParams {
            workers,
            ctx,
            range_gen,
            // 单连接模式没有区间可言，不写断点
            store: store.clone().filter(|_| plan.range_mode),
            progress: self.progress.clone(),
            settings: MonitorSettings {
                interval: self.config.monitor_interval,
                stall_speed_ratio: self.config.stall_speed_ratio,
                reset_window: self.config.reset_window,
                min_parallel_size: self.config.min_parallel_size,
            },
        });

        let cancel = self.controller.cancellation_token();
        monitor.run(&mut self.command_consumer, cancel).await?;

        info!(url = %self.url, "下载完成");
        Self::finish(writer.as_deref(), store.as_ref()).await
    }

    /// 读取断点，大小或区间对不上就丢弃
    async fn load_resumable(store: &InstanceStateStore, total_size: i64) -> Option<InstanceState> {
        let state = store.load().await?;
        if state.is_valid_for(total_size) {
            info!(path = %store.path().display(), remaining = state.remaining(), "从断点继续下载");
            Some(state)
        } else {
            warn!(
                path = %store.path().display(),
                saved_total = state.total_size,
                total_size,
                "断点与远程文件不一致，重新下载"
            );
            None
        }
    }

    /// 初始区间，以及定长分块模式下尚未发出的生成器
    fn initial_ranges(
        plan: &TransferPlan,
        total_size: Option<i64>,
        pending: Option<Vec<RangeSnapshot>>,
    ) -> (Vec<RangeSnapshot>, Option<RangeListGen>) {
        let total = match (plan.range_mode, total_size) {
            (true, Some(total)) => total,
            // 单连接：一个覆盖全部的区间，大小未知时不设上限
            (_, known) => {
                let end = known.map_or(i64::MAX - 1, |total| total - 1);
                return (vec![RangeSnapshot::new(0, end)], None);
            }
        };
        if let Some(pending) = pending {
            return (pending, None);
        }
        if plan.block_size >= total / plan.parallel as i64 {
            return (RangeListGen::even_split(total, plan.parallel).collect(), None);
        }
        let mut range_gen = RangeListGen::fixed_block(total, plan.block_size);
        let ranges = range_gen.by_ref().take(plan.parallel).collect();
        (ranges, Some(range_gen))
    }

    async fn finish(writer: Option<&Writer>, store: Option<&InstanceStateStore>) -> Result<(), DownloadError> {
        if let Some(writer) = writer {
            writer.flush().await.map_err(DownloadError::WriteFile)?;
        }
        if let Some(store) = store {
            store.remove().await?;
        }
        Ok(())
    }
}
