//! 下载器端到端测试：本地 HTTP 服务器 + 内存/文件输出。
//!
//! 覆盖：均分下载、断点续传、单连接回退、测试模式、限流退避、镜像校验、
//! 错误体解析、写盘失败、卡住的连接被重置（含单连接模式）、慢区间被拆分、进度一致性、暂停/继续、取消。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::downloader::{
    BlockSizeMode, ControlCommand, DownloadError, Downloader, HeadProbe, InstanceState, InstanceStateStore,
    MemoryWriter, RangeSnapshot, WorkerStatus, WriterAt,
};
use crate::tests::{ServerBehavior, TestServer, Trickle, random_content};
use crate::webdav::impl_traits::DavStatusDecoder;
use crate::{build_remote_downloader, download_remote_file, instance_state_path_for};

/// 小文件也能按 4 路并发切分
fn downloader_for(server: &TestServer) -> Downloader {
    Downloader::new(Client::new(), server.url())
        .max_parallel(4)
        .min_parallel_size(100)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn even_split_downloads_everything() {
    let content = random_content(1000);
    let server = TestServer::start(content.clone(), ServerBehavior::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("a.bin.downloading");

    let writer = MemoryWriter::new();
    let downloader = downloader_for(&server)
        .instance_state_path(&state_path)
        .with_writer(writer.clone());
    let progress = downloader.progress();

    downloader.send().await.unwrap();

    assert_eq!(writer.to_vec(), content);
    assert!(!state_path.exists(), "成功后断点文件应被删除");
    assert_eq!(
        server.ranged_requests(),
        vec!["bytes=0-249", "bytes=250-499", "bytes=500-749", "bytes=750-999"]
    );

    let last = progress.get_current().unwrap();
    assert_eq!(last.status.total_size, 1000);
    assert_eq!(last.status.downloaded, 1000);
    assert_eq!(last.workers.len(), 4);
    assert!(last.workers.iter().all(|w| w.status == WorkerStatus::Succeeded));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resumes_from_checkpoint() {
    let content = random_content(1000);
    // 慢速输出，第一份进度发布时还没有任何数据落盘
    let server = TestServer::start(content.clone(), slow_server_behavior()).await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("b.bin.downloading");
    let saved = InstanceState::new(1000, vec![RangeSnapshot::new(500, 999)]);
    InstanceStateStore::new(&state_path).save(&saved).await.unwrap();

    let writer = MemoryWriter::new();
    let downloader = downloader_for(&server)
        .instance_state_path(&state_path)
        .with_writer(writer.clone());
    let progress = downloader.progress();
    let mut watcher = progress.watch();

    let (result, first) = tokio::join!(downloader.send(), async { watcher.changed().await.unwrap() });
    result.unwrap();

    assert_eq!(first.status.total_size, 1000);
    assert_eq!(first.status.downloaded, 500);
    assert_eq!(first.workers.len(), 1);
    assert_eq!(first.workers[0].range, RangeSnapshot::new(500, 999));

    assert_eq!(server.ranged_requests(), vec!["bytes=500-999"]);
    let written = writer.to_vec();
    assert_eq!(&written[500..], &content[500..]);
    // 前半段是断点之前就下好的，这次没有碰
    assert!(written[..500].iter().all(|b| *b == 0));
    assert_eq!(progress.get_current().unwrap().status.downloaded, 1000);
    assert!(!state_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mismatched_checkpoint_is_discarded() {
    let content = random_content(1000);
    let server = TestServer::start(content.clone(), ServerBehavior::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("c.bin.downloading");
    let saved = InstanceState::new(2000, vec![RangeSnapshot::new(1500, 1999)]);
    InstanceStateStore::new(&state_path).save(&saved).await.unwrap();

    let writer = MemoryWriter::new();
    downloader_for(&server)
        .instance_state_path(&state_path)
        .with_writer(writer.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(writer.to_vec(), content);
    assert_eq!(server.ranged_requests().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn completed_checkpoint_finishes_without_requests() {
    let server = TestServer::start(random_content(1000), ServerBehavior::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("d.bin.downloading");
    let saved = InstanceState::new(1000, vec![RangeSnapshot::new(1000, 999)]);
    InstanceStateStore::new(&state_path).save(&saved).await.unwrap();

    downloader_for(&server)
        .instance_state_path(&state_path)
        .with_writer(MemoryWriter::new())
        .send()
        .await
        .unwrap();

    assert!(server.ranged_requests().is_empty());
    assert!(!state_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn falls_back_to_single_stream_without_range_support() {
    let content = random_content(5000);
    let behavior = ServerBehavior {
        accept_ranges: false,
        ..Default::default()
    };
    let server = TestServer::start(content.clone(), behavior).await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("e.bin.downloading");

    let writer = MemoryWriter::new();
    let downloader = downloader_for(&server)
        .instance_state_path(&state_path)
        .with_writer(writer.clone());
    let progress = downloader.progress();
    downloader.send().await.unwrap();

    assert_eq!(writer.to_vec(), content);
    let requests = server.requests();
    // 探测一次，下载一次，都不带 Range
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.range.is_none()));
    assert_eq!(progress.get_current().unwrap().workers.len(), 1);
    assert!(!state_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mode_touches_nothing() {
    let server = TestServer::start(random_content(1000), ServerBehavior::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("f.bin.downloading");

    let downloader = downloader_for(&server)
        .instance_state_path(&state_path)
        .test_mode(true);
    let progress = downloader.progress();
    downloader.send().await.unwrap();

    assert_eq!(progress.get_current().unwrap().status.downloaded, 1000);
    assert!(!state_path.exists());
    assert_eq!(server.ranged_requests().len(), 4);
}

#[tokio::test]
async fn missing_writer_is_rejected_before_any_request() {
    let server = TestServer::start(random_content(10), ServerBehavior::default()).await;
    let result = downloader_for(&server).send().await;
    assert!(matches!(result, Err(DownloadError::NoDestination)));
    assert!(server.requests().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn empty_resource_completes_immediately() {
    let server = TestServer::start(Vec::new(), ServerBehavior::default()).await;
    let writer = MemoryWriter::new();
    downloader_for(&server)
        .with_writer(writer.clone())
        .send()
        .await
        .unwrap();
    assert!(writer.is_empty());
    assert!(server.ranged_requests().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn throttled_requests_back_off_and_retry() {
    let content = random_content(1000);
    let behavior = ServerBehavior {
        throttle_first: 2,
        ..Default::default()
    };
    let server = TestServer::start(content.clone(), behavior).await;

    let writer = MemoryWriter::new();
    Downloader::new(Client::new(), server.url())
        .throttle_base_delay(Duration::from_millis(20))
        .with_writer(writer.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(writer.to_vec(), content);
    assert_eq!(server.ranged_requests(), vec!["bytes=0-999"; 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mirrors_are_verified_before_use() {
    let content = random_content(1000);
    let primary = TestServer::start(content.clone(), ServerBehavior::default()).await;
    let good = TestServer::start(content.clone(), ServerBehavior::default()).await;
    let wrong_size = TestServer::start(random_content(999), ServerBehavior::default()).await;
    let wrong_type = TestServer::start(
        content.clone(),
        ServerBehavior {
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            ..Default::default()
        },
    )
    .await;

    let writer = MemoryWriter::new();
    downloader_for(&primary)
        .with_mirrors(vec![good.url(), wrong_size.url(), wrong_type.url()])
        .with_writer(writer.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(writer.to_vec(), content);
    // 四个区间在主链接和合格镜像之间轮询
    assert_eq!(primary.ranged_requests().len(), 2);
    assert_eq!(good.ranged_requests().len(), 2);
    // 不合格的镜像只收到探测请求
    assert_eq!(wrong_size.requests().len(), 1);
    assert!(wrong_size.ranged_requests().is_empty());
    assert!(wrong_type.ranged_requests().is_empty());
}

#[tokio::test]
async fn dav_error_body_is_decoded() {
    let body = r#"<?xml version="1.0" encoding="utf-8"?>
<d:error xmlns:d="DAV:" xmlns:s="http://sabredav.org/ns">
  <s:exception>Sabre\DAV\Exception\NotFound</s:exception>
  <s:message>File not found</s:message>
</d:error>"#;
    let behavior = ServerBehavior {
        error: Some((404, body.to_string())),
        ..Default::default()
    };
    let server = TestServer::start(Vec::new(), behavior).await;

    let result = Downloader::new(Client::new(), server.url())
        .with_status_decoder(DavStatusDecoder)
        .with_writer(MemoryWriter::new())
        .send()
        .await;
    match result {
        Err(DownloadError::Remote { status, code, message }) => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(code, r"Sabre\DAV\Exception\NotFound");
            assert_eq!(message, "File not found");
        }
        other => panic!("预期 Remote，得到 {:?}", other),
    }

    let result = Downloader::new(Client::new(), server.url())
        .with_writer(MemoryWriter::new())
        .send()
        .await;
    assert!(matches!(
        result,
        Err(DownloadError::HttpStatus { status: StatusCode::NOT_FOUND, .. })
    ));
}

struct BrokenDisk;

#[async_trait]
impl WriterAt for BrokenDisk {
    async fn write_at(&mut self, _offset: u64, _data: &[u8]) -> std::io::Result<()> {
        Err(std::io::Error::other("disk full"))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn write_failure_is_fatal_and_keeps_checkpoint() {
    let server = TestServer::start(random_content(1000), ServerBehavior::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("g.bin.downloading");

    let result = downloader_for(&server)
        .instance_state_path(&state_path)
        .with_writer(BrokenDisk)
        .send()
        .await;

    assert!(matches!(result, Err(DownloadError::WriteFile(_))));
    let saved = InstanceStateStore::new(&state_path).load().await.unwrap();
    assert_eq!(saved.total_size, 1000);
    // 一个字节都没写成功
    assert_eq!(saved.remaining(), 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stalled_connection_is_reset() {
    let content = random_content(1000);
    let behavior = ServerBehavior {
        stall_once_at: Some(0),
        ..Default::default()
    };
    let server = TestServer::start(content.clone(), behavior).await;

    let writer = MemoryWriter::new();
    tokio::time::timeout(
        Duration::from_secs(10),
        Downloader::new(Client::new(), server.url())
            .monitor_interval(Duration::from_millis(50))
            .reset_window(Duration::from_millis(200))
            .with_writer(writer.clone())
            .send(),
    )
    .await
    .expect("卡住的连接应被重置")
    .unwrap();

    assert_eq!(writer.to_vec(), content);
    assert_eq!(server.ranged_requests(), vec!["bytes=0-999"; 2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_range_is_split_to_idle_worker() {
    let content = random_content(4000);
    let behavior = ServerBehavior {
        trickle: Some(Trickle {
            begin: Some(2000),
            chunk: 100,
            delay: Duration::from_millis(50),
        }),
        ..Default::default()
    };
    let server = TestServer::start(content.clone(), behavior).await;

    let writer = MemoryWriter::new();
    Downloader::new(Client::new(), server.url())
        .max_parallel(2)
        .min_parallel_size(500)
        .cache_size(100)
        .monitor_interval(Duration::from_millis(100))
        // 只要有空闲 worker 就拆
        .stall_speed_ratio(1.1)
        .reset_window(Duration::from_secs(60))
        .with_writer(writer.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(writer.to_vec(), content);
    let ranges = server.ranged_requests();
    assert_eq!(ranges[0], "bytes=0-1999");
    assert_eq!(ranges[1], "bytes=2000-3999");
    assert!(ranges.len() >= 3, "慢区间应被拆分: {:?}", ranges);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn published_progress_keeps_ranges_and_downloaded_consistent() {
    let total = 4000;
    let content = random_content(total);
    let behavior = ServerBehavior {
        trickle: Some(Trickle {
            begin: Some(2000),
            chunk: 100,
            delay: Duration::from_millis(30),
        }),
        ..Default::default()
    };
    let server = TestServer::start(content.clone(), behavior).await;

    let writer = MemoryWriter::new();
    let downloader = Downloader::new(Client::new(), server.url())
        .max_parallel(2)
        .min_parallel_size(500)
        .cache_size(100)
        .monitor_interval(Duration::from_millis(50))
        .stall_speed_ratio(1.1)
        .reset_window(Duration::from_secs(60))
        .with_writer(writer.clone());
    let progress = downloader.progress();
    let mut watcher = progress.watch();

    let check = async {
        let mut samples = 0;
        loop {
            let p = watcher.changed().await.unwrap();
            let remaining: i64 = p.workers.iter().map(|w| w.range.len()).sum();
            assert_eq!(remaining + p.status.downloaded, total as i64, "{:?}", p);
            samples += 1;
            if remaining == 0 && p.workers.iter().all(|w| w.status == WorkerStatus::Succeeded) {
                break samples;
            }
        }
    };
    let (result, samples) = tokio::time::timeout(Duration::from_secs(20), async {
        tokio::join!(downloader.send(), check)
    })
    .await
    .unwrap();

    result.unwrap();
    assert!(samples >= 3, "进度发布次数过少: {}", samples);
    assert_eq!(writer.to_vec(), content);
    assert!(server.ranged_requests().len() >= 3, "慢区间应被拆分");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_stream_reconnect_skips_written_prefix() {
    let content = random_content(1000);
    let behavior = ServerBehavior {
        accept_ranges: false,
        cut_once: Some(500),
        ..Default::default()
    };
    let server = TestServer::start(content.clone(), behavior).await;

    let writer = MemoryWriter::new();
    let downloader = Downloader::new(Client::new(), server.url())
        .with_probe(HeadProbe)
        .cache_size(100)
        .monitor_interval(Duration::from_millis(100))
        .reset_window(Duration::from_millis(300))
        .with_writer(writer.clone());
    let progress = downloader.progress();

    tokio::time::timeout(Duration::from_secs(10), downloader.send())
        .await
        .expect("断开的单连接应被重置")
        .unwrap();

    assert_eq!(writer.to_vec(), content);
    assert_eq!(progress.get_current().unwrap().status.downloaded, 1000);
    let gets: Vec<_> = server.requests().into_iter().filter(|r| r.method == "GET").collect();
    assert_eq!(gets.len(), 2);
    assert!(gets.iter().all(|r| r.range.is_none()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fixed_block_mode_hands_out_remaining_blocks() {
    let content = random_content(1000);
    let server = TestServer::start(content.clone(), ServerBehavior::default()).await;

    let writer = MemoryWriter::new();
    Downloader::new(Client::new(), server.url())
        .max_parallel(2)
        .min_parallel_size(100)
        .block_size(BlockSizeMode::FixedBlock(200))
        .with_writer(writer.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(writer.to_vec(), content);
    assert_eq!(
        server.ranged_requests(),
        vec!["bytes=0-199", "bytes=200-399", "bytes=400-599", "bytes=600-799", "bytes=800-999"]
    );
}

fn slow_server_behavior() -> ServerBehavior {
    ServerBehavior {
        trickle: Some(Trickle {
            begin: None,
            chunk: 100,
            delay: Duration::from_millis(30),
        }),
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pause_and_resume() {
    let content = random_content(2000);
    let server = TestServer::start(content.clone(), slow_server_behavior()).await;

    let writer = MemoryWriter::new();
    let downloader = Downloader::new(Client::new(), server.url())
        .max_parallel(2)
        .min_parallel_size(1000)
        .cache_size(100)
        .monitor_interval(Duration::from_millis(50))
        .reset_window(Duration::from_secs(60))
        .with_writer(writer.clone());
    let controller = downloader.get_controller();
    let progress = downloader.progress();

    let control = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        controller.pause().unwrap();
        assert_eq!(controller.last_command(), Some(ControlCommand::Pause));
        tokio::time::sleep(Duration::from_millis(150)).await;

        let paused = progress.get_current().unwrap();
        assert!(paused.workers.iter().all(|w| matches!(
            w.status,
            WorkerStatus::Paused | WorkerStatus::Succeeded
        )));
        tokio::time::sleep(Duration::from_millis(200)).await;
        let still = progress.get_current().unwrap();
        assert_eq!(paused.status.downloaded, still.status.downloaded, "暂停期间不应再有数据");

        controller.resume().unwrap();
    };
    let (result, ()) = tokio::join!(downloader.send(), control);

    result.unwrap();
    assert_eq!(writer.to_vec(), content);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_keeps_checkpoint() {
    let content = random_content(2000);
    let server = TestServer::start(content, slow_server_behavior()).await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("h.bin.downloading");

    let downloader = Downloader::new(Client::new(), server.url())
        .max_parallel(2)
        .min_parallel_size(1000)
        .cache_size(100)
        .monitor_interval(Duration::from_millis(50))
        .instance_state_path(&state_path)
        .with_writer(MemoryWriter::new());
    let controller = downloader.get_controller();

    let control = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        controller.cancel().unwrap();
    };
    let (result, ()) = tokio::join!(downloader.send(), control);

    assert!(matches!(result, Err(DownloadError::Cancelled)));
    assert!(controller.is_cancelled());
    let saved = InstanceStateStore::new(&state_path).load().await.unwrap();
    assert_eq!(saved.total_size, 2000);
    assert_eq!(saved.ranges.len(), 2);
    assert!(saved.remaining() > 0);
    assert!(saved.remaining() < 2000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn remote_entrance_writes_file() {
    let content = random_content(3000);
    let server = TestServer::start(content.clone(), ServerBehavior::default()).await;
    let auth = crate::auth::WebdavAuth::new("u", "p", &server.base_url()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let save_path = dir.path().join("file.bin");

    let downloader = build_remote_downloader(&auth, "./file.bin").unwrap();
    assert_eq!(downloader.url(), server.url());

    download_remote_file(&auth, "file.bin", &save_path, Default::default())
        .await
        .unwrap();

    assert_eq!(std::fs::read(&save_path).unwrap(), content);
    assert!(!instance_state_path_for(&save_path).exists());
}

#[test]
fn instance_state_path_convention() {
    let path = instance_state_path_for(std::path::Path::new("/tmp/a.bin"));
    assert_eq!(path, std::path::PathBuf::from("/tmp/a.bin.downloading"));
}

#[test]
fn invalid_remote_path_is_rejected() {
    let auth = crate::auth::WebdavAuth::new("u", "p", "http://localhost:8080/dav/").unwrap();
    assert!(matches!(
        build_remote_downloader(&auth, "../secret"),
        Err(DownloadError::InvalidUrl(_))
    ));
}
