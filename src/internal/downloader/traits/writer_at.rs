use async_trait::async_trait;

/// 支持随机位置写入的输出目标。
#[async_trait]
pub trait WriterAt: Send + Sync {
    /// 把 `data` 写到 `offset` 处
    async fn write_at(&mut self, offset: u64, data: &[u8]) -> std::io::Result<()>;

    /// 预分配空间，默认什么也不做
    async fn preallocate(&mut self, _size: u64) -> std::io::Result<()> {
        Ok(())
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
