//! 探测结果。

use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap};
use reqwest::{Response, StatusCode};

use crate::internal::downloader::constants::MAX_ERROR_BODY;
use crate::internal::downloader::traits::status_decoder::StatusDecoder;

use super::download_error::DownloadError;

#[derive(Debug)]
pub struct ProbeInfo {
    /// `Content-Length`，缺失或无法解析时为 `None`
    pub content_length: Option<i64>,
    /// 服务器是否声明支持字节范围请求
    pub accept_ranges: bool,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// 原始响应，非 2xx 时用来读错误体
    pub(crate) response: Option<Response>,
}

impl ProbeInfo {
    /// 从响应头解析，保留响应本身。
    pub fn from_response(response: Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let mut info = Self::from_parts(status, headers);
        info.response = Some(response);
        info
    }

    pub fn from_parts(status: StatusCode, headers: HeaderMap) -> Self {
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&len| len >= 0);
        let accept_ranges = status == StatusCode::PARTIAL_CONTENT
            || headers
                .get(ACCEPT_RANGES)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.split(',').any(|unit| unit.trim().eq_ignore_ascii_case("bytes")));
        Self {
            content_length,
            accept_ranges,
            status,
            headers,
            response: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// 丢弃响应体，关闭连接。
    pub fn discard_body(&mut self) {
        self.response = None;
    }

    /// 把非 2xx 响应翻译成错误。
    pub(crate) async fn into_error(self, decoder: &dyn StatusDecoder) -> DownloadError {
        let body = match self.response {
            Some(response) => read_error_body(response).await,
            None => Vec::new(),
        };
        decode_status(decoder, self.status, &body)
    }
}

/// 读取错误响应体，最多 [`MAX_ERROR_BODY`] 字节。
pub(crate) async fn read_error_body(mut response: Response) -> Vec<u8> {
    let mut body = Vec::new();
    while let Ok(Some(chunk)) = response.chunk().await {
        let room = MAX_ERROR_BODY.saturating_sub(body.len());
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= MAX_ERROR_BODY {
            break;
        }
    }
    body
}

/// 先交给解码器，解不出来就退回 `HttpStatus`。
pub(crate) fn decode_status(decoder: &dyn StatusDecoder, status: StatusCode, body: &[u8]) -> DownloadError {
    decoder.decode(status, body).unwrap_or_else(|| DownloadError::HttpStatus {
        status,
        text: String::from_utf8_lossy(body).trim().to_string(),
    })
}
