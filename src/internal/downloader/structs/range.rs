//! 字节区间。
//!
//! [`Range`] 是 worker 与监控循环共享的可变区间 `[begin, end]`（两端包含）：
//! - worker 只推进 `begin`，推进前先在区间锁内"预留"即将写入的字节；
//! - 监控循环只收缩 `end`（拆分），拆分点从 `begin + 预留` 之后算起，
//!   所以已预留、正在写盘的字节永远不会再分给别人；
//! - 保存断点时直接读两个原子量，不拿锁。
//!
//! `begin == end + 1` 表示区间已下载完。

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::download_error::DownloadError;

/// 区间的只读快照，也是断点文件里的序列化格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSnapshot {
    pub begin: i64,
    pub end: i64,
}

impl RangeSnapshot {
    pub fn new(begin: i64, end: i64) -> Self {
        Self { begin, end }
    }

    /// 剩余字节数，已完成的区间为 0。
    pub fn len(&self) -> i64 {
        (self.end - self.begin + 1).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 同 [`RangeSnapshot::is_empty`]，读起来更贴近业务。
    pub fn is_done(&self) -> bool {
        self.is_empty()
    }
}

/// 一次写入前的预留：从 `offset` 开始的 `len` 个字节归当前 worker 所有。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub offset: i64,
    pub len: i64,
}

#[derive(Debug)]
pub struct Range {
    begin: AtomicI64,
    end: AtomicI64,
    /// 已预留但尚未提交的字节数，同时充当区间锁
    reserved: Mutex<i64>,
}

impl Range {
    pub fn new(begin: i64, end: i64) -> Self {
        Self {
            begin: AtomicI64::new(begin),
            end: AtomicI64::new(end),
            reserved: Mutex::new(0),
        }
    }

    pub fn begin(&self) -> i64 {
        self.begin.load(Ordering::Acquire)
    }

    pub fn end(&self) -> i64 {
        self.end.load(Ordering::Acquire)
    }

    pub fn len(&self) -> i64 {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_done(&self) -> bool {
        self.is_empty()
    }

    /// 无锁快照，供断点保存与进度展示使用。
    pub fn snapshot(&self) -> RangeSnapshot {
        RangeSnapshot {
            begin: self.begin(),
            end: self.end(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, i64> {
        self.reserved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 预留至多 `want` 个字节。区间已经没有剩余（被拆分截断或已完成）时返回 `None`。
    ///
    /// 同一时刻只能有一个预留，重复预留说明 worker 之间串了区间，按内部错误处理。
    pub fn reserve(&self, want: i64) -> Result<Option<Reservation>, DownloadError> {
        let mut reserved = self.lock();
        if *reserved != 0 {
            return Err(DownloadError::ChunkedInternal(format!(
                "区间 [{}, {}] 已有 {} 字节未提交的预留",
                self.begin(),
                self.end(),
                *reserved
            )));
        }
        let begin = self.begin();
        let available = self.end() - begin + 1;
        if available <= 0 || want <= 0 {
            return Ok(None);
        }
        let len = want.min(available);
        *reserved = len;
        Ok(Some(Reservation { offset: begin, len }))
    }

    /// 写盘成功后提交预留，推进 `begin`。
    ///
    /// 返回 `Ok(false)` 表示区间在此期间被整体重新分配，调用方应静默退出。
    pub fn commit(&self, reservation: Reservation) -> Result<bool, DownloadError> {
        let mut reserved = self.lock();
        *reserved = 0;
        if self.begin() != reservation.offset {
            return Ok(false);
        }
        let next = reservation.offset + reservation.len;
        if next > self.end() + 1 {
            return Err(DownloadError::ChunkedInternal(format!(
                "提交越界: 写到 {} 但区间终点为 {}",
                next - 1,
                self.end()
            )));
        }
        self.begin.store(next, Ordering::Release);
        Ok(true)
    }

    /// 放弃当前预留（写盘失败或连接被取消）。
    pub fn release(&self) {
        *self.lock() = 0;
    }

    /// 把剩余部分的上半段切出去。
    ///
    /// 拆分点从 `begin + 预留` 算起；剩余不超过 `min_remaining` 时不拆。
    /// 本区间保留 `[start, mid]`，返回 `[mid + 1, end]`。
    pub fn split_half(&self, min_remaining: i64) -> Option<RangeSnapshot> {
        let reserved = self.lock();
        let start = self.begin() + *reserved;
        let end = self.end();
        let remaining = end - start + 1;
        if remaining <= min_remaining.max(1) {
            return None;
        }
        let mid = start + (end - start) / 2;
        self.end.store(mid, Ordering::Release);
        Some(RangeSnapshot::new(mid + 1, end))
    }

    /// 整体换成新区间，只用于已经空闲的 worker。
    pub fn assign(&self, range: RangeSnapshot) {
        let mut reserved = self.lock();
        *reserved = 0;
        self.begin.store(range.begin, Ordering::Release);
        self.end.store(range.end, Ordering::Release);
    }
}

impl From<RangeSnapshot> for Range {
    fn from(value: RangeSnapshot) -> Self {
        Range::new(value.begin, value.end)
    }
}
