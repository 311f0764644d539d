use async_trait::async_trait;
use reqwest::Client;

use crate::internal::downloader::structs::download_error::DownloadError;
use crate::internal::downloader::structs::probe_info::ProbeInfo;

/// 下载前的资源探测。
///
/// 只有网络层面的失败才返回 `Err`；非 2xx 状态照常返回，由下载器结合
/// [`StatusDecoder`](super::status_decoder::StatusDecoder) 解析响应体。
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, client: &Client, url: &str) -> Result<ProbeInfo, DownloadError>;
}
