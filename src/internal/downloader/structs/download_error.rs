//! 下载相关错误类型。

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP 请求失败: {0}")]
    Request(#[from] reqwest::Error),

    #[error("服务器返回异常状态 {status}: {text}")]
    HttpStatus { status: StatusCode, text: String },

    #[error("远程服务错误 {status} ({code}): {message}")]
    Remote {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("请求的范围已失效")]
    RangeNotSatisfiable,

    #[error("服务器忽略了 Range 请求头")]
    RangeIgnored,

    #[error("数据流提前结束，还差 {remaining} 字节")]
    UnexpectedEof { remaining: i64 },

    #[error("服务器限流中 ({0})")]
    Throttled(StatusCode),

    #[error("未设置写入目标且未开启测试模式")]
    NoDestination,

    #[error("创建文件失败: {0}")]
    CreateFile(std::io::Error),

    #[error("写入文件失败: {0}")]
    WriteFile(std::io::Error),

    #[error("预分配文件空间失败: {0}")]
    PreallocateFile(std::io::Error),

    #[error("断点文件读写失败: {0}")]
    Checkpoint(std::io::Error),

    #[error("断点文件格式错误: {0}")]
    CheckpointFormat(#[from] serde_json::Error),

    #[error("下载被取消")]
    Cancelled,

    #[error("分片任务失败: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("分片下载内部错误: {0}")]
    ChunkedInternal(String),

    #[error("链接格式错误: {0}")]
    InvalidUrl(String),
}

impl DownloadError {
    /// 是否属于只影响单个 worker、可以重试的错误。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DownloadError::Request(_)
                | DownloadError::RangeNotSatisfiable
                | DownloadError::RangeIgnored
                | DownloadError::UnexpectedEof { .. }
                | DownloadError::Throttled(_)
                | DownloadError::HttpStatus { .. }
                | DownloadError::Remote { .. }
        )
    }
}
