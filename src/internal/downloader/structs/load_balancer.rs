use std::sync::atomic::{AtomicUsize, Ordering};

/// 主链接与通过校验的镜像之间轮询分配。
#[derive(Debug)]
pub struct LoadBalancer {
    urls: Vec<String>,
    cursor: AtomicUsize,
}

impl LoadBalancer {
    pub fn new(primary: impl Into<String>, mirrors: Vec<String>) -> Self {
        let mut urls = Vec::with_capacity(mirrors.len() + 1);
        urls.push(primary.into());
        urls.extend(mirrors);
        Self {
            urls,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn next_url(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.urls.len();
        &self.urls[index]
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
