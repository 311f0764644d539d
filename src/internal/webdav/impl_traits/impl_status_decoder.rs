use reqwest::StatusCode;

use crate::internal::downloader::structs::download_error::DownloadError;
use crate::internal::downloader::traits::status_decoder::StatusDecoder;
use crate::internal::webdav::raw_xml::dav_error::DavError;

/// 解析 WebDAV 服务端（Sabre / Nextcloud 等）返回的 XML 错误体。
#[derive(Debug, Clone, Copy, Default)]
pub struct DavStatusDecoder;

impl StatusDecoder for DavStatusDecoder {
    fn decode(&self, status: StatusCode, body: &[u8]) -> Option<DownloadError> {
        let error = DavError::parse(body)?;
        Some(DownloadError::Remote {
            status,
            code: error.exception.unwrap_or_default(),
            message: error.message.unwrap_or_default(),
        })
    }
}
