use std::path::PathBuf;
use std::time::Duration;

use crate::internal::downloader::constants::{
    DEFAULT_CACHE_SIZE, DEFAULT_MAX_PARALLEL, DEFAULT_MIRROR_CHECK_HEADERS, DEFAULT_MIRROR_PROBE_TIMEOUT,
    DEFAULT_MONITOR_INTERVAL, DEFAULT_RESET_WINDOW, DEFAULT_STALL_SPEED_RATIO, DEFAULT_THROTTLE_BASE_DELAY,
    MIN_PARALLEL_SIZE,
};

use super::downloader::plan::TransferPlan;

/// 分块策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockSizeMode {
    /// 按并发数均分，最后一块吸收余数
    #[default]
    EvenSplit,
    /// 固定块大小（字节），多出来的块留给空闲 worker
    FixedBlock(i64),
}

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// 最大并发数
    pub max_parallel: usize,
    /// 每个 worker 的读缓存大小（字节）
    pub cache_size: usize,
    pub block_size: BlockSizeMode,
    /// 限速（字节/秒），`None` 不限速
    pub rate_limit: Option<u64>,
    /// 断点文件路径，`None` 不保存断点
    pub instance_state_path: Option<PathBuf>,
    /// 测试模式：照常下载但不写盘、不存断点
    pub test_mode: bool,

    /// 小于该大小的区间不再拆分
    pub min_parallel_size: i64,
    pub monitor_interval: Duration,
    pub stall_speed_ratio: f64,
    pub reset_window: Duration,
    pub throttle_base_delay: Duration,
    pub mirror_probe_timeout: Duration,
    /// 镜像必须与主链接一致的响应头
    pub mirror_check_headers: Vec<String>,

    /// 由下载器在探测之后算出，只算一次
    pub(crate) plan: Option<TransferPlan>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            cache_size: DEFAULT_CACHE_SIZE,
            block_size: BlockSizeMode::EvenSplit,
            rate_limit: None,
            instance_state_path: None,
            test_mode: false,
            min_parallel_size: MIN_PARALLEL_SIZE,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            stall_speed_ratio: DEFAULT_STALL_SPEED_RATIO,
            reset_window: DEFAULT_RESET_WINDOW,
            throttle_base_delay: DEFAULT_THROTTLE_BASE_DELAY,
            mirror_probe_timeout: DEFAULT_MIRROR_PROBE_TIMEOUT,
            mirror_check_headers: DEFAULT_MIRROR_CHECK_HEADERS.iter().map(|h| h.to_string()).collect(),
            plan: None,
        }
    }
}

impl DownloaderConfig {
    /// 已经算好的执行计划
    pub fn plan(&self) -> Option<TransferPlan> {
        self.plan
    }
}
