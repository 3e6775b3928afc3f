//! 组件释放

use infrastructure_common::BoxError;

/// 由生命周期作用域负责释放的组件
///
/// 组件在注册时通过 `.disposable()` 声明后，创建它的作用域会在释放时调用 [`Disposable::dispose`]，
/// 每个实例至多一次。
pub trait Disposable: Send + Sync {
    /// 释放组件持有的资源
    fn dispose(&self) -> Result<(), BoxError>;
}
