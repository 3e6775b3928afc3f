//! 带参数的组件工厂
//!
//! `Factory<(A1, A2), S>` 每次调用都激活一个新的 `S`，调用时提供的参数按类型绑定到
//! 构造函数中类型相同的参数，与参数位置无关；其余参数照常从容器解析。

use crate::resolver::{downcast_instance, Dependency, Instance, Resolvable, Resolved, TypedArgument};
use infrastructure_common::{DependencyResult, ServiceKey};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 工厂参数元组
pub trait FactoryArguments: Send + 'static {
    /// 各参数的服务标识
    fn keys() -> Vec<ServiceKey>;

    /// 转换为类型化参数
    fn into_arguments(self) -> Vec<TypedArgument>;
}

impl FactoryArguments for () {
    fn keys() -> Vec<ServiceKey> {
        Vec::new()
    }

    fn into_arguments(self) -> Vec<TypedArgument> {
        Vec::new()
    }
}

macro_rules! impl_factory_arguments {
    ($($name:ident),+) => {
        impl<$($name),+> FactoryArguments for ($($name,)+)
        where
            $($name: Send + Sync + 'static),+
        {
            fn keys() -> Vec<ServiceKey> {
                vec![$(ServiceKey::of::<$name>()),+]
            }

            #[allow(non_snake_case)]
            fn into_arguments(self) -> Vec<TypedArgument> {
                let ($($name,)+) = self;
                vec![$(TypedArgument::new($name)),+]
            }
        }
    };
}

impl_factory_arguments!(A1);
impl_factory_arguments!(A1, A2);
impl_factory_arguments!(A1, A2, A3);
impl_factory_arguments!(A1, A2, A3, A4);

/// 工厂激活函数
#[derive(Clone)]
pub struct FactoryActivator(Arc<dyn Fn(Vec<TypedArgument>) -> DependencyResult<Instance> + Send + Sync>);

impl FactoryActivator {
    /// 创建工厂激活函数
    pub fn new<F>(activate: F) -> Self
    where
        F: Fn(Vec<TypedArgument>) -> DependencyResult<Instance> + Send + Sync + 'static,
    {
        Self(Arc::new(activate))
    }

    /// 以给定参数激活
    pub fn activate(&self, arguments: Vec<TypedArgument>) -> DependencyResult<Instance> {
        (self.0)(arguments)
    }
}

/// 组件工厂
pub struct Factory<A, S: ?Sized> {
    activator: FactoryActivator,
    _signature: PhantomData<fn(A) -> Arc<S>>,
}

impl<A: FactoryArguments, S: ?Sized + Send + Sync + 'static> Factory<A, S> {
    /// 以激活函数创建
    pub fn new(activator: FactoryActivator) -> Self {
        Self {
            activator,
            _signature: PhantomData,
        }
    }

    /// 以给定参数创建新的服务实例
    pub fn invoke(&self, arguments: A) -> DependencyResult<Arc<S>> {
        let instance = self.activator.activate(arguments.into_arguments())?;
        downcast_instance::<S>(&instance)
    }
}

impl<A, S: ?Sized> Clone for Factory<A, S> {
    fn clone(&self) -> Self {
        Self {
            activator: self.activator.clone(),
            _signature: PhantomData,
        }
    }
}

impl<A, S: ?Sized> fmt::Debug for Factory<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("arguments", &std::any::type_name::<A>())
            .field("service", &std::any::type_name::<S>())
            .finish()
    }
}

impl<A: FactoryArguments, S: ?Sized + Send + Sync + 'static> Resolvable for Factory<A, S> {
    fn dependency() -> Dependency {
        Dependency::Factory {
            arguments: A::keys(),
            service: ServiceKey::of::<S>(),
        }
    }

    fn from_resolved(resolved: Resolved) -> DependencyResult<Self> {
        match resolved {
            Resolved::Factory(activator) => Ok(Self::new(activator)),
            other => Err(other.mismatch::<Self>()),
        }
    }

    fn into_resolved(self) -> Resolved {
        Resolved::Factory(self.activator)
    }
}
