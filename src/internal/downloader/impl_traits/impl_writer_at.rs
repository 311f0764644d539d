use std::io::SeekFrom;
use std::sync::PoisonError;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::internal::downloader::structs::memory_writer::MemoryWriter;
use crate::internal::downloader::traits::writer_at::WriterAt;

#[async_trait]
impl WriterAt for File {
    async fn write_at(&mut self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        self.seek(SeekFrom::Start(offset)).await?;
        self.write_all(data).await
    }

    async fn preallocate(&mut self, size: u64) -> std::io::Result<()> {
        // 续传时大小本来就一致，不会动到已写的数据；旧文件更长时截掉多余尾巴
        if self.metadata().await?.len() != size {
            self.set_len(size).await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        AsyncWriteExt::flush(self).await?;
        self.sync_data().await
    }
}

#[async_trait]
impl WriterAt for MemoryWriter {
    async fn write_at(&mut self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        let mut buffer = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let offset = offset as usize;
        let end = offset + data.len();
        if buffer.len() < end {
            buffer.resize(end, 0);
        }
        buffer[offset..end].copy_from_slice(data);
        Ok(())
    }

    async fn preallocate(&mut self, size: u64) -> std::io::Result<()> {
        let mut buffer = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        if (buffer.len() as u64) < size {
            buffer.resize(size as usize, 0);
        }
        Ok(())
    }
}
