//! 执行计划：并发数、分块大小、缓存大小。

use crate::internal::downloader::structs::downloader_config::{BlockSizeMode, DownloaderConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    pub parallel: usize,
    pub block_size: i64,
    pub cache_size: usize,
    /// 是否按区间并发下载；为 `false` 时单连接顺序读完
    pub range_mode: bool,
}

impl TransferPlan {
    /// - 不支持 Range 或大小未知：单连接；
    /// - 续传：沿用断点里未完成的区间数；
    /// - 否则 `min(最大并发, 总大小 / 最小拆分大小 + 1)`，至少为 1。
    ///
    /// 分块大小取均分大小与定长块中较小者，缓存不超过分块大小。
    pub fn compute(
        config: &DownloaderConfig,
        total_size: Option<i64>,
        accept_ranges: bool,
        resumed_ranges: Option<usize>,
    ) -> Self {
        let known_total = total_size.filter(|&t| t > 0);
        let range_mode = accept_ranges && known_total.is_some();

        let parallel = match (range_mode, known_total, resumed_ranges) {
            (false, _, _) | (true, None, _) => 1,
            (true, Some(_), Some(saved)) => saved.max(1),
            (true, Some(total), None) => {
                let by_size = (total / config.min_parallel_size.max(1)) as usize + 1;
                by_size.min(config.max_parallel).max(1)
            }
        };

        let block_size = match known_total {
            Some(total) => {
                let even = (total / parallel as i64).max(1);
                match config.block_size {
                    BlockSizeMode::EvenSplit => even,
                    BlockSizeMode::FixedBlock(fixed) => even.min(fixed.max(1)),
                }
            }
            None => i64::MAX,
        };

        let cache_size = (config.cache_size.max(1) as i64).min(block_size) as usize;

        Self {
            parallel,
            block_size,
            cache_size,
            range_mode,
        }
    }
}
