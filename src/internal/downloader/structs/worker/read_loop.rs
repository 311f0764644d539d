use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::Response;

use crate::internal::downloader::structs::download_error::DownloadError;
use crate::internal::downloader::structs::worker_status::WorkerStatus;

use super::{Worker, WorkerFailure};

/// 刷一次缓存之后要不要继续读
enum Flow {
    Continue,
    /// 区间已写满（可能是被拆分截短了），多余的数据丢弃
    RangeEnd,
}

fn internal(error: DownloadError) -> WorkerFailure {
    WorkerFailure::new(WorkerStatus::InternalError, error)
}

impl Worker {
    /// 读响应体，攒满一块缓存就写一次。
    pub(super) async fn read_body(&self, response: Response) -> Result<(), WorkerFailure> {
        let mut buffer = self.ctx.cache_pool.get();
        let mut offset = self.range.begin();
        self.set_status(WorkerStatus::Downloading);

        let result = self.pump(response, &mut buffer, &mut offset).await;
        self.ctx.cache_pool.put(buffer);
        result
    }

    async fn pump(&self, response: Response, buffer: &mut BytesMut, offset: &mut i64) -> Result<(), WorkerFailure> {
        let capacity = self.ctx.cache_pool.buffer_size();
        let mut stream = Box::pin(response.bytes_stream());
        // 单连接模式重连时服务器从头发送，已经写过的部分要跳过
        let mut skip = if self.ctx.range_mode { 0 } else { *offset };

        loop {
            match stream.next().await {
                Some(Ok(mut chunk)) => {
                    if skip > 0 {
                        let dropped = skip.min(chunk.len() as i64);
                        let _ = chunk.split_to(dropped as usize);
                        skip -= dropped;
                        self.touch();
                    }
                    while !chunk.is_empty() {
                        let take = (capacity - buffer.len()).min(chunk.len());
                        buffer.extend_from_slice(&chunk.split_to(take));
                        if buffer.len() >= capacity {
                            if let Flow::RangeEnd = self.flush_buffer(buffer, offset).await? {
                                return Ok(());
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    // 已经收到的先落盘，下次少下一点
                    if let Flow::RangeEnd = self.flush_buffer(buffer, offset).await? {
                        return Ok(());
                    }
                    return Err(WorkerFailure::new(WorkerStatus::Failed, e.into()));
                }
                None => {
                    if let Flow::RangeEnd = self.flush_buffer(buffer, offset).await? {
                        return Ok(());
                    }
                    if !self.ctx.range_mode {
                        if skip > 0 {
                            return Err(WorkerFailure::new(
                                WorkerStatus::Failed,
                                DownloadError::UnexpectedEof { remaining: skip },
                            ));
                        }
                        return Ok(());
                    }
                    let remaining = self.range.len();
                    if remaining == 0 {
                        return Ok(());
                    }
                    return Err(WorkerFailure::new(
                        WorkerStatus::Failed,
                        DownloadError::UnexpectedEof { remaining },
                    ));
                }
            }
        }
    }

    /// 预留 → 写盘 → 提交。
    async fn flush_buffer(&self, buffer: &mut BytesMut, offset: &mut i64) -> Result<Flow, WorkerFailure> {
        if buffer.is_empty() {
            return Ok(if self.ctx.range_mode && self.range.is_done() {
                Flow::RangeEnd
            } else {
                Flow::Continue
            });
        }

        if let Some(limiter) = &self.ctx.rate_limiter {
            limiter.acquire(buffer.len()).await;
        }

        let reservation = match self.range.reserve(buffer.len() as i64).map_err(internal)? {
            Some(reservation) => reservation,
            None => {
                buffer.clear();
                return Ok(Flow::RangeEnd);
            }
        };
        if reservation.offset != *offset {
            self.range.release();
            return Err(WorkerFailure::new(
                WorkerStatus::Failed,
                DownloadError::ChunkedInternal(format!(
                    "区间起点已变为 {}，与当前写入位置 {} 不一致",
                    reservation.offset, offset
                )),
            ));
        }

        let len = reservation.len as usize;
        self.set_status(WorkerStatus::WaitingToWrite);
        if let Some(writer) = &self.ctx.writer {
            if let Err(e) = writer.write_at(reservation.offset, &buffer[..len]).await {
                self.range.release();
                return Err(internal(DownloadError::WriteFile(e)));
            }
        }
        let committed = {
            let _ledger = self.ctx.ledger_shared();
            let committed = self.range.commit(reservation).map_err(internal)?;
            if committed {
                self.ctx.status.add_downloaded(reservation.len);
            }
            committed
        };
        if !committed {
            return Err(WorkerFailure::new(
                WorkerStatus::Failed,
                DownloadError::ChunkedInternal("写入期间区间被重新分配".to_string()),
            ));
        }

        self.record_bytes(reservation.len);
        *offset += reservation.len;
        self.set_status(WorkerStatus::Downloading);

        let truncated = len < buffer.len();
        buffer.clear();
        if truncated || (self.ctx.range_mode && self.range.is_done()) {
            Ok(Flow::RangeEnd)
        } else {
            Ok(Flow::Continue)
        }
    }
}
