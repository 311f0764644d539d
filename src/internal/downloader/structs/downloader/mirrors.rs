//! 镜像校验。

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::internal::downloader::structs::probe_info::ProbeInfo;

use super::Downloader;

impl Downloader {
    /// 并发探测所有镜像，返回大小与校验头都和主链接一致的那些。
    pub(crate) async fn verify_mirrors(&self, primary: &ProbeInfo) -> Vec<String> {
        let timeout = self.config.mirror_probe_timeout;
        let checks = self.mirrors.iter().map(|url| async move {
            match tokio::time::timeout(timeout, self.probe.probe(&self.client, url)).await {
                Ok(Ok(info)) => {
                    let accepted = self.mirror_matches(primary, &info);
                    if !accepted {
                        warn!(url = %url, status = %info.status, "镜像与主链接不一致，丢弃");
                    }
                    accepted.then(|| url.clone())
                }
                Ok(Err(e)) => {
                    warn!(url = %url, error = %e, "镜像探测失败，丢弃");
                    None
                }
                Err(_) => {
                    warn!(url = %url, ?timeout, "镜像探测超时，丢弃");
                    None
                }
            }
        });
        let accepted: Vec<String> = join_all(checks).await.into_iter().flatten().collect();
        info!(total = self.mirrors.len(), accepted = accepted.len(), "镜像校验完成");
        accepted
    }

    fn mirror_matches(&self, primary: &ProbeInfo, mirror: &ProbeInfo) -> bool {
        mirror.is_success()
            && mirror.content_length == primary.content_length
            && self
                .config
                .mirror_check_headers
                .iter()
                .all(|name| primary.headers.get(name.as_str()) == mirror.headers.get(name.as_str()))
    }
}
