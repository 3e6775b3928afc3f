//! 组件构造函数描述
//!
//! 容器无法在运行时检查构造函数签名，组件通过 [`ConstructorDescriptor`]
//! 声明每个构造函数的参数列表和激活函数。描述可以手写，也可以由
//! `#[derive(Injectable)]` 从结构体字段生成。

use crate::resolver::{instance_of, Dependency, Instance, Resolvable, Resolved};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime, ServiceKey, TypeInfo};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 参数默认值
pub type DefaultValue = Arc<dyn Fn() -> Resolved + Send + Sync>;

/// 构造函数参数
#[derive(Clone)]
pub struct Parameter {
    /// 参数名称，用于绑定注册时提供的命名参数
    pub name: String,
    /// 参数所需的依赖形态
    pub dependency: Dependency,
    /// 默认值；存在时参数是可选的
    pub default: Option<DefaultValue>,
}

impl Parameter {
    /// 是否为可选参数
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("dependency", &self.dependency)
            .field("optional", &self.is_optional())
            .finish()
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_optional() {
            write!(f, "{}: {} = default", self.name, self.dependency)
        } else {
            write!(f, "{}: {}", self.name, self.dependency)
        }
    }
}

/// 传给激活函数的参数值，按参数声明顺序依次取出
pub struct Arguments {
    type_name: &'static str,
    values: std::vec::IntoIter<Resolved>,
}

impl Arguments {
    /// 创建参数列表
    pub fn new(type_name: &'static str, values: Vec<Resolved>) -> Self {
        Self {
            type_name,
            values: values.into_iter(),
        }
    }

    /// 取出下一个参数
    pub fn next<P: Resolvable>(&mut self) -> DependencyResult<P> {
        let resolved = self.values.next().ok_or_else(|| {
            DependencyError::resolution_failed(self.type_name, "激活函数读取的参数多于声明的参数")
        })?;
        P::from_resolved(resolved)
    }

    /// 取出下一个参数并克隆出值（用于 `i32`、`String` 等普通值参数）
    pub fn value<T: Clone + Send + Sync + 'static>(&mut self) -> DependencyResult<T> {
        let value = self.next::<Arc<T>>()?;
        Ok((*value).clone())
    }

    /// 剩余参数数量
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// 类型擦除后的激活函数
pub type Activator = Arc<dyn Fn(&mut Arguments) -> DependencyResult<Instance> + Send + Sync>;

/// 构造函数描述
pub struct ConstructorDescriptor<T> {
    parameters: Vec<Parameter>,
    activator: Arc<dyn Fn(&mut Arguments) -> DependencyResult<T> + Send + Sync>,
    _component: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ConstructorDescriptor<T> {
    /// 以激活函数创建构造函数描述，参数随后按声明顺序添加
    pub fn new<F>(activator: F) -> Self
    where
        F: Fn(&mut Arguments) -> DependencyResult<T> + Send + Sync + 'static,
    {
        Self {
            parameters: Vec::new(),
            activator: Arc::new(activator),
            _component: PhantomData,
        }
    }

    /// 添加必需参数
    #[must_use]
    pub fn parameter<P: Resolvable>(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            dependency: P::dependency(),
            default: None,
        });
        self
    }

    /// 添加指向命名服务的参数
    #[must_use]
    pub fn named_service<S: ?Sized + Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            dependency: Dependency::Service(ServiceKey::named::<S>(service_name)),
            default: None,
        });
        self
    }

    /// 添加带默认值的可选参数
    #[must_use]
    pub fn optional<P, D>(mut self, name: impl Into<String>, default: D) -> Self
    where
        P: Resolvable,
        D: Fn() -> P + Send + Sync + 'static,
    {
        self.parameters.push(Parameter {
            name: name.into(),
            dependency: P::dependency(),
            default: Some(Arc::new(move || default().into_resolved())),
        });
        self
    }

    /// 参数列表
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// 签名文本，如 `(count: i32, name: String)`
    pub fn signature(&self) -> String {
        signature_of(&self.parameters)
    }

    /// 擦除组件类型
    pub fn into_erased(self) -> ErasedConstructor {
        let activator = self.activator;
        ErasedConstructor {
            component: TypeInfo::of::<T>(),
            parameters: self.parameters,
            activator: Arc::new(move |arguments: &mut Arguments| {
                activator(arguments).map(|component| instance_of(Arc::new(component)))
            }),
        }
    }
}

impl<T> fmt::Debug for ConstructorDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("component", &std::any::type_name::<T>())
            .field("signature", &signature_of(&self.parameters))
            .finish()
    }
}

fn signature_of(parameters: &[Parameter]) -> String {
    let parameters = parameters
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("({parameters})")
}

/// 类型擦除后的构造函数
///
/// 激活结果是以 `Arc<C>` 形式保存的组件实例。
#[derive(Clone)]
pub struct ErasedConstructor {
    pub component: TypeInfo,
    pub parameters: Vec<Parameter>,
    activator: Activator,
}

impl ErasedConstructor {
    /// 以按参数顺序排列的值激活组件
    pub fn activate(&self, values: Vec<Resolved>) -> DependencyResult<Instance> {
        if values.len() != self.parameters.len() {
            return Err(DependencyError::resolution_failed(
                self.component.name,
                format!(
                    "参数数量不匹配: 需要 {}, 提供 {}",
                    self.parameters.len(),
                    values.len()
                ),
            ));
        }
        let mut arguments = Arguments::new(self.component.name, values);
        (self.activator)(&mut arguments)
    }

    /// 参数总数（可选参数计入）
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// 签名文本
    pub fn signature(&self) -> String {
        signature_of(&self.parameters)
    }
}

impl fmt::Debug for ErasedConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedConstructor")
            .field("component", &self.component.name)
            .field("signature", &self.signature())
            .finish()
    }
}

/// 可注册组件 trait
///
/// 由容器按构造函数激活的组件实现此 trait。
pub trait RegisterableComponent: Send + Sync + Sized + 'static {
    /// 全部构造函数
    fn constructors() -> Vec<ConstructorDescriptor<Self>>;

    /// 获取默认生命周期
    fn default_lifetime() -> Lifetime {
        Lifetime::PerDependency
    }
}
