//! 延迟解析
//!
//! `Lazy<S>` 在解析时不激活任何组件，首次调用 [`Lazy::value`] 时才解析 `S`，之后返回同一个值。

use crate::resolver::{downcast_instance, instance_of, Dependency, Instance, Resolvable, Resolved};
use infrastructure_common::{DependencyResult, ServiceKey};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// 延迟激活函数，调用时在捕获的作用域中解析服务
#[derive(Clone)]
pub struct LazyActivator(Arc<dyn Fn() -> DependencyResult<Instance> + Send + Sync>);

impl LazyActivator {
    /// 创建延迟激活函数
    pub fn new<F>(activate: F) -> Self
    where
        F: Fn() -> DependencyResult<Instance> + Send + Sync + 'static,
    {
        Self(Arc::new(activate))
    }

    /// 执行解析
    pub fn activate(&self) -> DependencyResult<Instance> {
        (self.0)()
    }
}

/// 延迟解析的服务
pub struct Lazy<S: ?Sized> {
    activator: LazyActivator,
    value: OnceCell<Arc<S>>,
}

impl<S: ?Sized + Send + Sync + 'static> Lazy<S> {
    /// 以激活函数创建
    pub fn new(activator: LazyActivator) -> Self {
        Self {
            activator,
            value: OnceCell::new(),
        }
    }

    /// 获取服务值，首次调用时解析
    pub fn value(&self) -> DependencyResult<Arc<S>> {
        self.value
            .get_or_try_init(|| {
                trace!("延迟解析服务: {}", std::any::type_name::<S>());
                downcast_instance::<S>(&self.activator.activate()?)
            })
            .cloned()
    }

    /// 服务值是否已经创建
    pub fn is_value_created(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<S: ?Sized> fmt::Debug for Lazy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("service", &std::any::type_name::<S>())
            .field("created", &self.value.get().is_some())
            .finish()
    }
}

impl<S: ?Sized + Send + Sync + 'static> Resolvable for Lazy<S> {
    fn dependency() -> Dependency {
        Dependency::Lazy(ServiceKey::of::<S>())
    }

    fn from_resolved(resolved: Resolved) -> DependencyResult<Self> {
        match resolved {
            Resolved::Lazy(activator) => Ok(Self::new(activator)),
            other => Err(other.mismatch::<Self>()),
        }
    }

    fn into_resolved(self) -> Resolved {
        match self.value.into_inner() {
            Some(value) => Resolved::Lazy(LazyActivator::new(move || {
                Ok(instance_of(Arc::clone(&value)))
            })),
            None => Resolved::Lazy(self.activator),
        }
    }
}
