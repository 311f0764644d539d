//! 简单的每秒字节数限速器。

use std::time::Duration;

use tokio::sync::Mutex as TokioMutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Window {
    started_at: Instant,
    used: u64,
}

/// 以一秒为窗口统计已放行字节数，超出则睡到下一个窗口。
///
/// 整个任务共用一个，锁在等待期间一直持有，所以排队是公平的。
#[derive(Debug)]
pub struct RateLimiter {
    bytes_per_second: u64,
    window: TokioMutex<Window>,
}

impl RateLimiter {
    pub fn new(bytes_per_second: u64) -> Self {
        Self {
            bytes_per_second: bytes_per_second.max(1),
            window: TokioMutex::new(Window {
                started_at: Instant::now(),
                used: 0,
            }),
        }
    }

    pub fn bytes_per_second(&self) -> u64 {
        self.bytes_per_second
    }

    /// 申请放行 `bytes` 字节。单次申请超过窗口额度时独占一个窗口。
    pub async fn acquire(&self, bytes: usize) {
        let bytes = bytes as u64;
        let mut window = self.window.lock().await;
        loop {
            let now = Instant::now();
            if now.duration_since(window.started_at) >= Duration::from_secs(1) {
                window.started_at = now;
                window.used = 0;
            }
            if window.used == 0 || window.used + bytes <= self.bytes_per_second {
                window.used += bytes;
                return;
            }
            tokio::time::sleep_until(window.started_at + Duration::from_secs(1)).await;
        }
    }
}
