//! 并行可续传下载引擎。
//!
//! 一次下载任务只处理一个远程资源：探测大小与 Range 支持 → 规划并发与分块 →
//! 每个分块由一个 worker 独立下载 → 监控循环负责汇总速度、写断点、救活卡死的
//! worker 以及把慢 worker 的剩余区间切给空闲 worker。
//!
//! 对外导出以 [`crate::downloader`] 为准，此处仅做模块划分。

pub mod constants;
pub mod impl_traits;
pub mod structs;
pub mod traits;
