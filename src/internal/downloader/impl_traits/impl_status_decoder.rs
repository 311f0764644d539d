use reqwest::StatusCode;

use crate::internal::downloader::structs::download_error::DownloadError;
use crate::internal::downloader::traits::status_decoder::StatusDecoder;

/// 默认解码器：不认识任何响应体，一律退回 `HttpStatus`。
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainStatusDecoder;

impl StatusDecoder for PlainStatusDecoder {
    fn decode(&self, status: StatusCode, _body: &[u8]) -> Option<DownloadError> {
        match status {
            StatusCode::RANGE_NOT_SATISFIABLE => Some(DownloadError::RangeNotSatisfiable),
            _ => None,
        }
    }
}
