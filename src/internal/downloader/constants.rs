//! 下载引擎的默认参数与小工具函数。

use std::time::Duration;

/// 小于该大小的区间不值得再拆分（128KB）
pub const MIN_PARALLEL_SIZE: i64 = 128 * 1024;

/// 默认最大并发数
pub const DEFAULT_MAX_PARALLEL: usize = 8;

/// 默认读缓存大小（64KB），规划时会被压到不超过分块大小
pub const DEFAULT_CACHE_SIZE: usize = 64 * 1024;

/// 监控循环周期
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(1);

/// 总速度低于历史最高速度的该比例时，认为任务卡住了
pub const DEFAULT_STALL_SPEED_RATIO: f64 = 0.1;

/// worker 至少空转这么久才会被重置
pub const DEFAULT_RESET_WINDOW: Duration = Duration::from_secs(2);

/// 429/509 限流时的基础退避时长
pub const DEFAULT_THROTTLE_BASE_DELAY: Duration = Duration::from_secs(1);

/// 镜像探测超时
pub const DEFAULT_MIRROR_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// 断点文件后缀，约定为 `<保存路径>.downloading`
pub const INSTANCE_STATE_SUFFIX: &str = ".downloading";

/// 解析错误响应体时最多读取的字节数
pub const MAX_ERROR_BODY: usize = 64 * 1024;

/// 镜像一致性校验默认比对的响应头
pub const DEFAULT_MIRROR_CHECK_HEADERS: [&str; 2] = ["Content-MD5", "Content-Type"];

/// 生成 Range 请求头：`bytes=begin-end`，两端都包含。
pub fn range_header(begin: i64, end: i64) -> String {
    format!("bytes={}-{}", begin, end)
}
