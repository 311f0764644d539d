//! 任务内共享的写入器。

use tokio::sync::Mutex as TokioMutex;

use crate::internal::downloader::traits::writer_at::WriterAt;

/// 包一层异步锁，所有 worker 共用一把写锁。
pub(crate) struct Writer {
    sink: TokioMutex<Box<dyn WriterAt>>,
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer").finish_non_exhaustive()
    }
}

impl Writer {
    pub(crate) fn new(sink: Box<dyn WriterAt>) -> Self {
        Self {
            sink: TokioMutex::new(sink),
        }
    }

    pub(crate) async fn write_at(&self, offset: i64, data: &[u8]) -> std::io::Result<()> {
        self.sink.lock().await.write_at(offset as u64, data).await
    }

    pub(crate) async fn preallocate(&self, size: i64) -> std::io::Result<()> {
        self.sink.lock().await.preallocate(size as u64).await
    }

    pub(crate) async fn flush(&self) -> std::io::Result<()> {
        self.sink.lock().await.flush().await
    }
}
