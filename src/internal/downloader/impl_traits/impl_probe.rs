use async_trait::async_trait;
use reqwest::header::{ACCEPT_ENCODING, HeaderValue};
use reqwest::{Client, Method};

use crate::internal::downloader::structs::download_error::DownloadError;
use crate::internal::downloader::structs::probe_info::ProbeInfo;
use crate::internal::downloader::traits::probe::Probe;

/// 默认探测：GET 拿到响应头后丢弃响应体。
#[derive(Debug, Clone, Copy, Default)]
pub struct GetProbe;

/// HEAD 探测，适合不希望多开一次完整 GET 的服务器。
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadProbe;

async fn send_probe(client: &Client, method: Method, url: &str) -> Result<ProbeInfo, DownloadError> {
    let response = client
        .request(method, url)
        // 分块下载按原始字节定位，不能让服务器压缩
        .header(ACCEPT_ENCODING, HeaderValue::from_static("identity"))
        .send()
        .await?;
    Ok(ProbeInfo::from_response(response))
}

#[async_trait]
impl Probe for GetProbe {
    async fn probe(&self, client: &Client, url: &str) -> Result<ProbeInfo, DownloadError> {
        let mut info = send_probe(client, Method::GET, url).await?;
        if info.is_success() {
            info.discard_body();
        }
        Ok(info)
    }
}

#[async_trait]
impl Probe for HeadProbe {
    async fn probe(&self, client: &Client, url: &str) -> Result<ProbeInfo, DownloadError> {
        send_probe(client, Method::HEAD, url).await
    }
}
