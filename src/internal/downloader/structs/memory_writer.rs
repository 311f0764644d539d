use std::sync::{Arc, Mutex, PoisonError};

/// 内存输出目标，可 Clone，所有克隆共享同一块内存。
///
/// 把一份交给下载器，自己留一份，下载结束后用 [`MemoryWriter::to_vec`] 取结果。
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    pub(crate) data: Arc<Mutex<Vec<u8>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
