//! 执行计划：并发数、分块大小、缓存大小的推导。

use crate::downloader::{BlockSizeMode, DownloaderConfig, MIN_PARALLEL_SIZE, TransferPlan};

#[test]
fn no_range_support_means_single_stream() {
    let config = DownloaderConfig::default();
    let plan = TransferPlan::compute(&config, Some(100 * MIN_PARALLEL_SIZE), false, None);
    assert_eq!(plan.parallel, 1);
    assert!(!plan.range_mode);
}

#[test]
fn unknown_length_means_single_stream() {
    let config = DownloaderConfig::default();
    let plan = TransferPlan::compute(&config, None, true, None);
    assert_eq!(plan.parallel, 1);
    assert!(!plan.range_mode);
    assert_eq!(plan.cache_size, config.cache_size);
}

#[test]
fn parallel_scales_with_size() {
    let config = DownloaderConfig {
        max_parallel: 8,
        ..Default::default()
    };
    // 不足一个最小拆分大小时只开一个
    let small = TransferPlan::compute(&config, Some(1000), true, None);
    assert_eq!(small.parallel, 1);

    let medium = TransferPlan::compute(&config, Some(3 * MIN_PARALLEL_SIZE), true, None);
    assert_eq!(medium.parallel, 4);

    let large = TransferPlan::compute(&config, Some(100 * MIN_PARALLEL_SIZE), true, None);
    assert_eq!(large.parallel, 8);
}

#[test]
fn resume_uses_saved_range_count() {
    let config = DownloaderConfig::default();
    let plan = TransferPlan::compute(&config, Some(1000), true, Some(3));
    assert_eq!(plan.parallel, 3);
    assert_eq!(plan.block_size, 333);
}

#[test]
fn block_size_takes_smaller_and_cache_is_clamped() {
    let config = DownloaderConfig {
        max_parallel: 4,
        min_parallel_size: 100,
        cache_size: 64 * 1024,
        block_size: BlockSizeMode::FixedBlock(100),
        ..Default::default()
    };
    let plan = TransferPlan::compute(&config, Some(1000), true, None);
    assert_eq!(plan.parallel, 4);
    assert_eq!(plan.block_size, 100);
    assert_eq!(plan.cache_size, 100);

    let even = DownloaderConfig {
        block_size: BlockSizeMode::EvenSplit,
        ..config
    };
    let plan = TransferPlan::compute(&even, Some(1000), true, None);
    assert_eq!(plan.block_size, 250);
    assert_eq!(plan.cache_size, 250);
}
