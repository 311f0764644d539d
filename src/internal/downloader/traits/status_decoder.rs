use reqwest::StatusCode;

use crate::internal::downloader::structs::download_error::DownloadError;

/// 把非 2xx 响应体翻译成具体错误。
///
/// 返回 `None` 时下载器退回到 [`DownloadError::HttpStatus`]。
pub trait StatusDecoder: Send + Sync {
    fn decode(&self, status: StatusCode, body: &[u8]) -> Option<DownloadError>;
}
