//! 组件解析器抽象接口
//!
//! 定义解析请求的依赖形态、解析结果以及单次解析调用的上下文

use crate::factory::FactoryActivator;
use crate::lazy::LazyActivator;
use infrastructure_common::{DependencyError, DependencyResult, ServiceKey};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 容器中的实例
///
/// 服务 `S` 的值以 `Arc<S>` 的形式保存在 `Any` 中，`S` 可以是 `dyn Trait`。
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 把服务值包装为容器实例
pub fn instance_of<S: ?Sized + Send + Sync + 'static>(value: Arc<S>) -> Instance {
    Arc::new(value)
}

/// 从容器实例中取出服务值
pub fn downcast_instance<S: ?Sized + Send + Sync + 'static>(
    instance: &Instance,
) -> DependencyResult<Arc<S>> {
    instance.downcast_ref::<Arc<S>>().cloned().ok_or_else(|| {
        DependencyError::resolution_failed(std::any::type_name::<S>(), "实例类型与服务类型不匹配")
    })
}

/// 依赖形态
///
/// 解析引擎在查询注册表之前先按形态分派，形态集合是封闭的。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// 直接服务依赖 `Arc<S>`
    Service(ServiceKey),
    /// 延迟解析 `Lazy<S>`
    Lazy(ServiceKey),
    /// 服务的全部实现 `Vec<Arc<S>>`
    Collection(ServiceKey),
    /// 带参数的工厂 `Factory<(A1, ..), S>`
    Factory {
        arguments: Vec<ServiceKey>,
        service: ServiceKey,
    },
}

impl Dependency {
    /// 依赖最终指向的服务
    pub fn service_key(&self) -> &ServiceKey {
        match self {
            Self::Service(key) | Self::Lazy(key) | Self::Collection(key) => key,
            Self::Factory { service, .. } => service,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(key) => write!(f, "{key}"),
            Self::Lazy(key) => write!(f, "Lazy<{key}>"),
            Self::Collection(key) => write!(f, "Vec<{key}>"),
            Self::Factory { arguments, service } => {
                let arguments = arguments
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Factory<({arguments}), {service}>")
            }
        }
    }
}

/// 解析结果，与 [`Dependency`] 一一对应
#[derive(Clone)]
pub enum Resolved {
    Instance(Instance),
    Lazy(LazyActivator),
    Collection(Vec<Instance>),
    Factory(FactoryActivator),
}

impl Resolved {
    fn shape(&self) -> &'static str {
        match self {
            Self::Instance(_) => "instance",
            Self::Lazy(_) => "lazy",
            Self::Collection(_) => "collection",
            Self::Factory(_) => "factory",
        }
    }

    /// 形态不匹配时的错误
    pub fn mismatch<T: ?Sized>(&self) -> DependencyError {
        DependencyError::resolution_failed(
            std::any::type_name::<T>(),
            format!("解析结果形态不匹配: {}", self.shape()),
        )
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection(items) => f
                .debug_struct("Resolved::Collection")
                .field("len", &items.len())
                .finish(),
            other => write!(f, "Resolved::{}", other.shape()),
        }
    }
}

/// 可被解析的依赖类型
///
/// 构造函数参数和顶层解析请求都以此 trait 描述自己需要的形态。
pub trait Resolvable: Sized + Send + Sync + 'static {
    /// 依赖形态
    fn dependency() -> Dependency;

    /// 从解析结果构造
    fn from_resolved(resolved: Resolved) -> DependencyResult<Self>;

    /// 转换回解析结果（用于参数默认值）
    fn into_resolved(self) -> Resolved;
}

impl<S: ?Sized + Send + Sync + 'static> Resolvable for Arc<S> {
    fn dependency() -> Dependency {
        Dependency::Service(ServiceKey::of::<S>())
    }

    fn from_resolved(resolved: Resolved) -> DependencyResult<Self> {
        match resolved {
            Resolved::Instance(instance) => downcast_instance::<S>(&instance),
            other => Err(other.mismatch::<S>()),
        }
    }

    fn into_resolved(self) -> Resolved {
        Resolved::Instance(instance_of(self))
    }
}

impl<S: ?Sized + Send + Sync + 'static> Resolvable for Vec<Arc<S>> {
    fn dependency() -> Dependency {
        Dependency::Collection(ServiceKey::of::<S>())
    }

    fn from_resolved(resolved: Resolved) -> DependencyResult<Self> {
        match resolved {
            Resolved::Collection(items) => items.iter().map(downcast_instance::<S>).collect(),
            other => Err(other.mismatch::<Self>()),
        }
    }

    fn into_resolved(self) -> Resolved {
        Resolved::Collection(self.into_iter().map(instance_of).collect())
    }
}

/// 按类型提供的参数值（工厂参数、装饰器的内部实例）
#[derive(Clone)]
pub struct TypedArgument {
    pub key: ServiceKey,
    pub value: Instance,
}

impl TypedArgument {
    /// 创建类型化参数
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            value: instance_of(Arc::new(value)),
        }
    }
}

impl fmt::Debug for TypedArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedArgument").field("key", &self.key).finish()
    }
}

/// 按名称绑定的参数值
#[derive(Debug, Clone)]
pub enum ParameterValue {
    /// 已知类型的值
    Typed(TypedArgument),
    /// 来自配置的 JSON 值，在绑定时转换为参数类型
    Json(serde_json::Value),
}

impl ParameterValue {
    /// 转换为指定服务类型的实例
    pub fn to_instance(&self, key: &ServiceKey) -> DependencyResult<Instance> {
        match self {
            Self::Typed(argument) if argument.key.type_id() == key.type_id() => {
                Ok(argument.value.clone())
            }
            Self::Typed(argument) => Err(DependencyError::resolution_failed(
                key.type_info.name,
                format!("参数值类型为 {}", argument.key),
            )),
            Self::Json(value) => json_to_instance(key, value),
        }
    }
}

fn json_value<T>(key: &ServiceKey, value: &serde_json::Value) -> DependencyResult<Instance>
where
    T: serde::de::DeserializeOwned + Send + Sync + 'static,
{
    serde_json::from_value::<T>(value.clone())
        .map(|v| instance_of(Arc::new(v)))
        .map_err(|e| DependencyError::resolution_failed(key.type_info.name, e.to_string()))
}

fn json_to_instance(key: &ServiceKey, value: &serde_json::Value) -> DependencyResult<Instance> {
    let id = key.type_id();
    if id == TypeId::of::<String>() {
        json_value::<String>(key, value)
    } else if id == TypeId::of::<bool>() {
        json_value::<bool>(key, value)
    } else if id == TypeId::of::<i32>() {
        json_value::<i32>(key, value)
    } else if id == TypeId::of::<i64>() {
        json_value::<i64>(key, value)
    } else if id == TypeId::of::<u32>() {
        json_value::<u32>(key, value)
    } else if id == TypeId::of::<u64>() {
        json_value::<u64>(key, value)
    } else if id == TypeId::of::<usize>() {
        json_value::<usize>(key, value)
    } else if id == TypeId::of::<f64>() {
        json_value::<f64>(key, value)
    } else if id == TypeId::of::<serde_json::Value>() {
        Ok(instance_of(Arc::new(value.clone())))
    } else {
        Err(DependencyError::resolution_failed(
            key.type_info.name,
            "配置参数不支持该类型",
        ))
    }
}

/// 按名称绑定的参数
#[derive(Debug, Clone)]
pub struct NamedArgument {
    pub name: String,
    pub value: ParameterValue,
}

/// 解析链中的一帧
#[derive(Debug, Clone)]
pub struct ResolutionFrame {
    pub service: ServiceKey,
    pub registration: u64,
}

/// 解析上下文
///
/// 只在一次顶层解析调用内有效，调用结束即丢弃。
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    resolution_chain: Vec<ResolutionFrame>,
    /// 解析选项
    pub options: ResolveOptions,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 将注册添加到解析链
    pub fn push_frame(&mut self, service: &ServiceKey, registration: u64) -> DependencyResult<()> {
        if self
            .resolution_chain
            .iter()
            .any(|frame| frame.registration == registration)
        {
            let chain = self
                .resolution_chain
                .iter()
                .map(|frame| frame.service.to_string())
                .chain(std::iter::once(service.to_string()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(DependencyError::CircularDependency {
                dependency_chain: chain,
            });
        }
        if self.resolution_chain.len() >= self.options.max_depth {
            return Err(DependencyError::resolution_failed(
                service.type_info.name,
                format!("超过最大解析深度 {}", self.options.max_depth),
            ));
        }
        self.resolution_chain.push(ResolutionFrame {
            service: service.clone(),
            registration,
        });
        Ok(())
    }

    /// 从解析链中移除最后一帧
    pub fn pop_frame(&mut self) {
        self.resolution_chain.pop();
    }

    /// 当前解析深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }
}

/// 解析选项
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// 最大递归深度
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}
