//! # QueueReactiveProperty：控制命令队列
//!
//! 基于 `tokio::sync::mpsc` 的单消费者 FIFO 队列。下载控制器通过它把
//! pause / resume / cancel 依次送进监控循环；同时把最近一条命令写进一个
//! [`ReactiveProperty`]，外部可以订阅命令回显。

use tokio::sync::mpsc;

use super::reactive_core::{PropertyWatcher, ReactiveProperty};

/// 生产者端，可 Clone。
#[derive(Clone, Debug)]
pub(crate) struct QueueReactiveProperty<T: Clone + Send + Sync + 'static> {
    sender: mpsc::UnboundedSender<T>,
    last: ReactiveProperty<Option<T>>,
}

/// 消费者端，独占接收。
#[derive(Debug)]
pub(crate) struct QueueReactiveConsumer<T: Clone + Send + Sync + 'static> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> QueueReactiveProperty<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// 返回 (生产者, 消费者)。
    pub(crate) fn new() -> (Self, QueueReactiveConsumer<T>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let producer = Self {
            sender,
            last: ReactiveProperty::new(None),
        };
        (producer, QueueReactiveConsumer { receiver })
    }

    /// 推送一条消息；消费者已关闭时把消息原样退回。
    pub(crate) fn send(&self, value: T) -> Result<(), T> {
        let _ = self.last.update(Some(value.clone()));
        self.sender.send(value).map_err(|e| e.0)
    }

    /// 最近一条被推送的消息。
    pub(crate) fn last(&self) -> Option<T> {
        self.last.get_current().flatten()
    }

    /// 订阅最近一条被推送的消息。
    pub(crate) fn watch(&self) -> PropertyWatcher<Option<T>> {
        self.last.watch()
    }
}

impl<T> QueueReactiveConsumer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// 等待下一条消息；所有生产者销毁后返回 `None`。
    pub(crate) async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// 非阻塞地取一条消息。
    pub(crate) fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}
