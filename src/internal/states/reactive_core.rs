//! # ReactiveProperty：响应式属性内核
//!
//! 基于 [`tokio::sync::watch`] 的共享状态容器，下载进度、控制命令回显等都建立在它之上。
//! 写入方调用 [`ReactiveProperty::update`]，读取方要么随时 `get_current()` 取快照，
//! 要么 `watch()` 之后 `changed().await` 等待下一次变化。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::watch;
use tokio::sync::watch::error::RecvError;

/// 响应式属性统一错误类型
#[derive(Debug, Error)]
pub enum ReactivePropertyError {
    /// 属性已被销毁，监听器不会再收到新值
    #[error("监听器已被销毁")]
    WatcherClosed,

    /// watch 通道接收失败
    #[error("接收失败: {0}")]
    RecvError(#[from] RecvError),
}

/// 共享的发送端。最后一个属性句柄销毁时推送 `None`，唤醒所有监听器让它们退出。
#[derive(Debug)]
pub(crate) struct Inner<T> {
    sender: watch::Sender<Option<T>>,
    is_dropped: AtomicBool,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.is_dropped.store(true, Ordering::Relaxed);
        let _ = self.sender.send(None);
    }
}

/// 响应式属性：可 Clone，所有克隆共享同一个值。
#[derive(Clone, Debug)]
pub struct ReactiveProperty<T: Clone + Send + Sync> {
    inner: Arc<Inner<T>>,
    cache_receiver: watch::Receiver<Option<T>>,
}

impl<T> ReactiveProperty<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(value: T) -> Self {
        let (sender, cache_receiver) = watch::channel(Some(value));
        Self {
            inner: Arc::new(Inner {
                sender,
                is_dropped: AtomicBool::new(false),
            }),
            cache_receiver,
        }
    }

    /// 写入新值并通知所有监听者；没有监听者时同样成功。
    pub fn update(&self, new_value: T) -> Result<&Self, ReactivePropertyError> {
        if self.inner.is_dropped.load(Ordering::Relaxed) {
            return Ok(self);
        }
        // send_replace 在没有接收者时也会更新值
        self.inner.sender.send_replace(Some(new_value));
        Ok(self)
    }

    /// 用闭包就地修改当前值。
    pub fn update_field<F, R>(&self, updater: F) -> Result<&Self, ReactivePropertyError>
    where
        F: FnOnce(&mut T) -> R,
    {
        if self.inner.is_dropped.load(Ordering::Relaxed) {
            return Ok(self);
        }
        self.inner.sender.send_modify(|slot| {
            if let Some(value) = slot.as_mut() {
                updater(value);
            }
        });
        Ok(self)
    }

    /// 当前值的快照（clone 一份）。
    pub fn get_current(&self) -> Option<T> {
        self.cache_receiver.borrow().as_ref().cloned()
    }

    /// 创建监听器。
    pub fn watch(&self) -> PropertyWatcher<T> {
        PropertyWatcher {
            receiver: self.inner.sender.subscribe(),
        }
    }
}

/// 属性监听器。不持有发送端：属性的所有句柄销毁后，`changed()` 返回错误，监听循环随之结束。
pub struct PropertyWatcher<T> {
    receiver: watch::Receiver<Option<T>>,
}

impl<T> PropertyWatcher<T>
where
    T: Clone + Send + Sync,
{
    /// 等待下一次变化并返回新值。
    pub async fn changed(&mut self) -> Result<T, ReactivePropertyError> {
        self.receiver.changed().await?;
        match self.receiver.borrow_and_update().as_ref() {
            None => Err(ReactivePropertyError::WatcherClosed),
            Some(value) => Ok(value.clone()),
        }
    }

    /// 同步读取当前值。
    pub fn borrow(&self) -> Option<T> {
        self.receiver.borrow().clone()
    }
}
