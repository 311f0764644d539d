//! 初始区间生成器。

use super::range::RangeSnapshot;

/// 按分块大小切出初始区间。
///
/// - 均分模式：最多切 `limit` 块，最后一块吸收余数；
/// - 定长模式：不限块数，未发出的尾部留在生成器里，等有 worker 空闲再发。
#[derive(Debug, Clone)]
pub struct RangeListGen {
    total_size: i64,
    block_size: i64,
    cursor: i64,
    limit: Option<usize>,
    issued: usize,
}

impl RangeListGen {
    /// 均分：`parallel` 块，每块 `total / parallel`。
    pub fn even_split(total_size: i64, parallel: usize) -> Self {
        let parallel = parallel.max(1);
        Self {
            total_size,
            block_size: (total_size / parallel as i64).max(1),
            cursor: 0,
            limit: Some(parallel),
            issued: 0,
        }
    }

    /// 定长分块。
    pub fn fixed_block(total_size: i64, block_size: i64) -> Self {
        Self {
            total_size,
            block_size: block_size.max(1),
            cursor: 0,
            limit: None,
            issued: 0,
        }
    }

    pub fn block_size(&self) -> i64 {
        self.block_size
    }

    /// 取下一块，切完返回 `None`。
    pub fn gen_range(&mut self) -> Option<RangeSnapshot> {
        if self.is_exhausted() {
            return None;
        }
        self.issued += 1;
        let last = self.limit.is_some_and(|limit| self.issued >= limit);
        let end = if last {
            self.total_size - 1
        } else {
            (self.cursor + self.block_size - 1).min(self.total_size - 1)
        };
        let range = RangeSnapshot::new(self.cursor, end);
        self.cursor = end + 1;
        Some(range)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.total_size
    }

    /// 尚未发出的尾部，写断点时作为一个额外区间保存。
    pub fn remaining(&self) -> Option<RangeSnapshot> {
        (!self.is_exhausted()).then(|| RangeSnapshot::new(self.cursor, self.total_size - 1))
    }

    pub fn remaining_len(&self) -> i64 {
        (self.total_size - self.cursor).max(0)
    }
}

impl Iterator for RangeListGen {
    type Item = RangeSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        self.gen_range()
    }
}
