use std::time::Duration;

use reqwest::header::{ACCEPT_ENCODING, HeaderValue, RANGE};
use reqwest::{Response, StatusCode};
use tracing::debug;

use crate::internal::downloader::constants::range_header;
use crate::internal::downloader::structs::download_error::DownloadError;
use crate::internal::downloader::structs::probe_info::{decode_status, read_error_body};
use crate::internal::downloader::structs::worker_status::WorkerStatus;

use super::{Worker, WorkerFailure};

/// 509 Bandwidth Limit Exceeded，非标准状态码
const BANDWIDTH_LIMIT_EXCEEDED: u16 = 509;

impl Worker {
    /// 发起请求直到拿到可读的响应；限流时退避后重试，每个退避周期最多一次请求。
    pub(super) async fn connect(&self) -> Result<Response, WorkerFailure> {
        loop {
            self.set_status(WorkerStatus::Pending);
            self.touch();

            let range = self.range.snapshot();
            let mut request = self
                .ctx
                .client
                .get(&self.url)
                .header(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
            if self.ctx.range_mode {
                request = request.header(RANGE, range_header(range.begin, range.end));
            }

            let response = request
                .send()
                .await
                .map_err(|e| WorkerFailure::new(WorkerStatus::NetError, e.into()))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == BANDWIDTH_LIMIT_EXCEEDED {
                drop(response);
                self.set_status(WorkerStatus::TooManyConnections);
                self.store_error(DownloadError::Throttled(status));
                let delay = self.throttle_delay();
                debug!(worker = self.id, %status, ?delay, "服务器限流，退避后重试");
                tokio::time::sleep(delay).await;
                continue;
            }

            if status == StatusCode::OK && self.ctx.range_mode && range.begin != 0 {
                return Err(WorkerFailure::new(WorkerStatus::NetError, DownloadError::RangeIgnored));
            }
            if status.is_success() {
                return Ok(response);
            }

            // 403 / 406 / 416 以及其他非 2xx：连接级错误，交给监控循环决定是否重连
            let error = if status == StatusCode::RANGE_NOT_SATISFIABLE {
                DownloadError::RangeNotSatisfiable
            } else {
                let body = read_error_body(response).await;
                decode_status(self.ctx.decoder.as_ref(), status, &body)
            };
            return Err(WorkerFailure::new(WorkerStatus::NetError, error));
        }
    }

    /// 退避时长：当前总速度越接近历史最高，等得越短，区间 [base, 2 * base]。
    pub(crate) fn throttle_delay(&self) -> Duration {
        let status = &self.ctx.status;
        let max = status.max_speeds();
        let ratio = if max > 0 {
            (status.speeds_per_second() as f64 / max as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.ctx.throttle_base_delay.mul_f64(2.0 - ratio)
    }
}
