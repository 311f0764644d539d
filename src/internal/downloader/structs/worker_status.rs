/// worker 状态。
///
/// 以 `u8` 存在原子量里，监控循环无锁读取。
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerStatus {
    Init = 0,
    Pending = 1,
    Downloading = 2,
    WaitingToWrite = 3,
    Succeeded = 4,
    Failed = 5,
    NetError = 6,
    TooManyConnections = 7,
    InternalError = 8,
    Canceled = 9,
    Paused = 10,
    Reset = 11,
}

impl WorkerStatus {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerStatus::Init,
            1 => WorkerStatus::Pending,
            2 => WorkerStatus::Downloading,
            3 => WorkerStatus::WaitingToWrite,
            4 => WorkerStatus::Succeeded,
            5 => WorkerStatus::Failed,
            6 => WorkerStatus::NetError,
            7 => WorkerStatus::TooManyConnections,
            8 => WorkerStatus::InternalError,
            9 => WorkerStatus::Canceled,
            10 => WorkerStatus::Paused,
            _ => WorkerStatus::Reset,
        }
    }

    /// 不会再自己动起来的状态
    pub fn is_completed(self) -> bool {
        matches!(self, WorkerStatus::Succeeded | WorkerStatus::Canceled)
    }

    /// 可重试的失败
    pub fn is_failed(self) -> bool {
        matches!(
            self,
            WorkerStatus::Failed | WorkerStatus::NetError | WorkerStatus::TooManyConnections
        )
    }

    /// 正在占用连接
    pub fn is_active(self) -> bool {
        matches!(
            self,
            WorkerStatus::Init
                | WorkerStatus::Pending
                | WorkerStatus::Downloading
                | WorkerStatus::WaitingToWrite
                | WorkerStatus::Reset
        )
    }
}
