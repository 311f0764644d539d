use std::sync::{Mutex, PoisonError};

use bytes::BytesMut;

/// 读缓存池：worker 每次连接借一块，连接结束归还。
#[derive(Debug)]
pub struct CachePool {
    buffer_size: usize,
    max_idle: usize,
    idle: Mutex<Vec<BytesMut>>,
}

impl CachePool {
    pub fn new(buffer_size: usize, max_idle: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
            max_idle,
            idle: Mutex::new(Vec::with_capacity(max_idle)),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// 借出一块已清空、容量不小于 `buffer_size` 的缓存
    pub fn get(&self) -> BytesMut {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match reused {
            Some(mut buffer) => {
                buffer.clear();
                buffer
            }
            None => BytesMut::with_capacity(self.buffer_size),
        }
    }

    pub fn put(&self, mut buffer: BytesMut) {
        if buffer.capacity() < self.buffer_size {
            return;
        }
        buffer.clear();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(buffer);
        }
    }

    pub fn idle_len(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
