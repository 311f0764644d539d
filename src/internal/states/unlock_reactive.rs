//! # UnlockReactiveProperty
//!
//! 无锁响应式属性：读写都不阻塞，适合下载进度这类高频刷新的状态。
//!
//! ## 使用示例
//! ```rust,no_run
//! use webdav_transfer::states::unlock_reactive::UnlockReactiveProperty;
//!
//! let prop = UnlockReactiveProperty::new(0u64);
//! prop.update(1).unwrap();
//! assert_eq!(prop.get_current(), Some(1));
//! ```

pub use super::reactive_core::{
    PropertyWatcher, ReactivePropertyError as UnlockReactivePropertyError,
};

/// 轻量级响应式属性容器。
pub type UnlockReactiveProperty<T> = super::reactive_core::ReactiveProperty<T>;
