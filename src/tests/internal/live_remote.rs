//! 真实 WebDAV 服务器上的下载，没有 `src/tests/env/live.env` 时跳过。

use crate::downloader::DownloaderConfig;
use crate::tests::load_account_optional;
use crate::{download_remote_file, instance_state_path_for};

#[tokio::test(flavor = "multi_thread")]
async fn download_remote_file_live() {
    let Some(account) = load_account_optional("live") else {
        println!("未配置 live.env，跳过");
        return;
    };
    let auth = account.to_webdav_auth().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let save_path = dir.path().join("live.bin");

    download_remote_file(&auth, &account.file, &save_path, DownloaderConfig::default())
        .await
        .unwrap();

    let len = std::fs::metadata(&save_path).unwrap().len();
    println!("downloaded {} bytes -> {:?}", len, save_path);
    assert!(!instance_state_path_for(&save_path).exists());
}
