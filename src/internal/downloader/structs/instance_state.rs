//! 断点文件。
//!
//! 格式为 JSON：`{"total_size": 1000, "ranges": [{"begin": 500, "end": 999}]}`，
//! 每个监控周期整体重写一次（先写临时文件再 rename），下载成功后删除。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::download_error::DownloadError;
use super::range::RangeSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceState {
    pub total_size: i64,
    pub ranges: Vec<RangeSnapshot>,
}

impl InstanceState {
    pub fn new(total_size: i64, ranges: Vec<RangeSnapshot>) -> Self {
        Self { total_size, ranges }
    }

    /// 所有区间剩余字节数之和
    pub fn remaining(&self) -> i64 {
        self.ranges.iter().map(RangeSnapshot::len).sum()
    }

    pub fn downloaded(&self) -> i64 {
        self.total_size - self.remaining()
    }

    /// 未完成的区间
    pub fn pending_ranges(&self) -> Vec<RangeSnapshot> {
        self.ranges.iter().copied().filter(|r| !r.is_done()).collect()
    }

    /// 与探测到的文件大小一致、且所有区间都落在 `[0, total_size)` 内才可信。
    pub fn is_valid_for(&self, total_size: i64) -> bool {
        if self.total_size != total_size {
            return false;
        }
        self.ranges.iter().all(|r| {
            r.begin >= 0 && r.end < total_size && r.begin <= r.end + 1
        }) && self.remaining() <= total_size
    }
}

/// 断点文件的读写。
#[derive(Debug, Clone)]
pub struct InstanceStateStore {
    path: PathBuf,
}

impl InstanceStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// 读取断点。文件不存在返回 `Ok(None)`；读不了或格式不对记一条警告后同样当作没有。
    pub async fn load(&self) -> Option<InstanceState> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "读取断点文件失败，忽略");
                return None;
            }
        };
        match serde_json::from_slice::<InstanceState>(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "断点文件格式错误，忽略");
                None
            }
        }
    }

    pub async fn save(&self, state: &InstanceState) -> Result<(), DownloadError> {
        let raw = serde_json::to_vec(state)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, raw)
            .await
            .map_err(DownloadError::Checkpoint)?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(DownloadError::Checkpoint)
    }

    /// 删除断点文件，不存在也算成功。
    pub async fn remove(&self) -> Result<(), DownloadError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DownloadError::Checkpoint(e)),
        }
    }
}
