use tokio_util::sync::CancellationToken;

use crate::internal::states::queue_reactive::{QueueReactiveConsumer, QueueReactiveProperty};
use crate::internal::states::reactive_core::PropertyWatcher;

use super::control_command::ControlCommand;

/// 下载控制器：命令走无锁队列，取消同时触发令牌，下载器在任何阶段都能及时退出。
#[derive(Debug)]
pub struct DownloaderController {
    command_queue: QueueReactiveProperty<ControlCommand>,
    cancel_token: CancellationToken,
}

/// 内部实现
impl DownloaderController {
    pub(crate) fn new(cancel_token: CancellationToken) -> (Self, QueueReactiveConsumer<ControlCommand>) {
        let (command_queue, command_consumer) = QueueReactiveProperty::new();
        (
            Self {
                command_queue,
                cancel_token,
            },
            command_consumer,
        )
    }
}

/// 外部接口：通过命令队列发送控制命令
impl DownloaderController {
    /// 暂停所有 worker（关闭连接，保留进度）
    pub fn pause(&self) -> Result<(), ControlCommand> {
        self.command_queue.send(ControlCommand::Pause)
    }

    /// 从各自区间的当前位置继续
    pub fn resume(&self) -> Result<(), ControlCommand> {
        self.command_queue.send(ControlCommand::Resume)
    }

    /// 取消下载，断点文件保留
    pub fn cancel(&self) -> Result<(), ControlCommand> {
        let result = self.command_queue.send(ControlCommand::Cancel);
        self.cancel_token.cancel();
        result
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 最近一次发出的命令
    pub fn last_command(&self) -> Option<ControlCommand> {
        self.command_queue.last()
    }

    /// 订阅命令回显
    pub fn watch_commands(&self) -> PropertyWatcher<Option<ControlCommand>> {
        self.command_queue.watch()
    }
}
