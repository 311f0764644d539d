pub mod cache_pool;
pub mod control_command;
pub mod download_error;
pub mod download_progress;
pub mod download_status;
pub mod downloader;
pub mod downloader_config;
pub mod downloader_controller;
pub mod instance_state;
pub mod job_context;
pub mod load_balancer;
pub mod memory_writer;
pub mod monitor;
pub mod probe_info;
pub mod range;
pub mod range_list_gen;
pub mod rate_limiter;
pub mod worker;
pub mod worker_status;
pub mod writer;

// 重导出公共类型
pub use cache_pool::CachePool;
pub use control_command::ControlCommand;
pub use download_error::DownloadError;
pub use download_progress::{DownloadProgress, StatusSnapshot, WorkerSnapshot};
pub use download_status::DownloadStatus;
pub use downloader::Downloader;
pub use downloader::plan::TransferPlan;
pub use downloader_config::{BlockSizeMode, DownloaderConfig};
pub use downloader_controller::DownloaderController;
pub use instance_state::{InstanceState, InstanceStateStore};
pub use load_balancer::LoadBalancer;
pub use memory_writer::MemoryWriter;
pub use probe_info::ProbeInfo;
pub use range::{Range, RangeSnapshot, Reservation};
pub use range_list_gen::RangeListGen;
pub use rate_limiter::RateLimiter;
pub use worker_status::WorkerStatus;
