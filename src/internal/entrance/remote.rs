use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;

use crate::internal::auth::structs::webdav_auth::WebdavAuth;
use crate::internal::downloader::constants::INSTANCE_STATE_SUFFIX;
use crate::internal::downloader::structs::download_error::DownloadError;
use crate::internal::downloader::structs::downloader::Downloader;
use crate::internal::downloader::structs::downloader_config::DownloaderConfig;
use crate::internal::webdav::functions::format_url_path::format_url_path;
use crate::internal::webdav::impl_traits::impl_status_decoder::DavStatusDecoder;

/// 断点文件的约定路径：`<保存路径>.downloading`
pub fn instance_state_path_for(save_path: &Path) -> PathBuf {
    let mut name = save_path.as_os_str().to_os_string();
    name.push(INSTANCE_STATE_SUFFIX);
    PathBuf::from(name)
}

/// 为 WebDAV 上的文件创建下载器，沿用认证信息里的 HTTP 客户端，错误体按 DAV XML 解析。
///
/// - 注意：relative_path 是基于 webdav_auth 中的 base_url 的，所以不建议以"/"开头
///
/// 需要暂停/取消或监听进度时用它，拿到 `get_controller()` / `progress()` 后再 `send()`。
pub fn build_remote_downloader(
    webdav_auth: &WebdavAuth,
    relative_path: &str,
) -> Result<Downloader, DownloadError> {
    let url = format_url_path(&webdav_auth.base_url, relative_path).map_err(DownloadError::InvalidUrl)?;
    Ok(Downloader::new(webdav_auth.client.clone(), url.to_string()).with_status_decoder(DavStatusDecoder))
}

/// 下载 WebDAV 上的文件到本地，支持断点续传。
///
/// 未指定断点路径时使用 `<save_path>.downloading`；本地文件不会被截断，已下载的部分会保留。
///
/// example:
/// ```ignore
/// let auth = WebdavAuth::new("account", "password", "http://localhost:8080/dav/")?;
/// download_remote_file(&auth, "./t2/a1.txt", "a1.txt", DownloaderConfig::default()).await?;
/// ```
pub async fn download_remote_file(
    webdav_auth: &WebdavAuth,
    relative_path: &str,
    save_path: impl AsRef<Path>,
    mut config: DownloaderConfig,
) -> Result<(), DownloadError> {
    let save_path = save_path.as_ref();
    if config.instance_state_path.is_none() {
        config.instance_state_path = Some(instance_state_path_for(save_path));
    }

    let downloader = build_remote_downloader(webdav_auth, relative_path)?.with_config(config);

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(save_path)
        .await
        .map_err(DownloadError::CreateFile)?;

    downloader.with_writer(file).send().await
}
