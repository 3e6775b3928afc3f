//! 注册目录
//!
//! 按注册顺序保存组件注册，回答“某个服务的默认实现是谁”和“某个服务的全部实现”两类查询。
//! 目录在容器构建后只读。

use crate::resolver::ComponentContext;
use di_abstractions::{Disposable, ErasedConstructor, Instance, NamedArgument};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime, ServiceKey, TypeInfo};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// 分配进程内唯一的注册标识
pub(crate) fn next_registration_id() -> u64 {
    NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed)
}

/// 组件实例到服务值的转换
pub(crate) type Caster = Arc<dyn Fn(&Instance) -> DependencyResult<Instance> + Send + Sync>;

/// 委托激活函数
pub(crate) type DelegateActivator =
    Arc<dyn Fn(&mut ComponentContext<'_>) -> DependencyResult<Instance> + Send + Sync>;

/// 从组件实例取出可释放接口
pub(crate) type Disposer = fn(&Instance) -> Option<Arc<dyn Disposable>>;

/// 组件的激活方式
#[derive(Clone)]
pub(crate) enum Activation {
    /// 从构造函数列表中选择一个激活
    Constructors(Vec<ErasedConstructor>),
    /// 预先创建的实例
    Instance(Instance),
    /// 委托
    Delegate(DelegateActivator),
}

/// 注册暴露的一个服务
#[derive(Clone)]
pub(crate) struct ServiceBinding {
    pub key: ServiceKey,
    pub caster: Caster,
}

/// 组件注册
pub struct Registration {
    pub(crate) id: u64,
    pub(crate) component: TypeInfo,
    pub(crate) services: Vec<ServiceBinding>,
    pub(crate) activation: Activation,
    pub(crate) lifetime: Lifetime,
    pub(crate) decorates: Option<ServiceKey>,
    pub(crate) preserve_existing_defaults: bool,
    pub(crate) parameters: Vec<NamedArgument>,
    pub(crate) disposer: Option<Disposer>,
}

impl Registration {
    /// 注册标识
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 组件类型
    pub fn component(&self) -> &TypeInfo {
        &self.component
    }

    /// 生命周期
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// 暴露的服务
    pub fn services(&self) -> impl Iterator<Item = &ServiceKey> {
        self.services.iter().map(|binding| &binding.key)
    }

    /// 是否为装饰器注册
    pub fn is_decorator(&self) -> bool {
        self.decorates.is_some()
    }

    /// 是否暴露指定服务
    pub fn provides(&self, key: &ServiceKey) -> bool {
        self.services.iter().any(|binding| &binding.key == key)
    }

    /// 把组件实例转换为指定服务的值
    pub(crate) fn cast(&self, component: &Instance, key: &ServiceKey) -> DependencyResult<Instance> {
        let binding = self
            .services
            .iter()
            .find(|binding| &binding.key == key)
            .ok_or_else(|| {
                DependencyError::resolution_failed(
                    self.component.name,
                    format!("注册未暴露服务 {key}"),
                )
            })?;
        (binding.caster)(component)
    }

    /// 取出组件实例的可释放接口
    pub(crate) fn disposable(&self, component: &Instance) -> Option<Arc<dyn Disposable>> {
        self.disposer.and_then(|disposer| disposer(component))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("component", &self.component.name)
            .field(
                "services",
                &self.services.iter().map(|b| b.key.to_string()).collect::<Vec<_>>(),
            )
            .field("lifetime", &self.lifetime)
            .field("decorates", &self.decorates)
            .field("preserve_existing_defaults", &self.preserve_existing_defaults)
            .finish()
    }
}

/// 注册目录
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    registrations: Vec<Arc<Registration>>,
}

impl Catalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加注册
    pub fn register(&mut self, registration: Registration) {
        self.registrations.push(Arc::new(registration));
    }

    /// 全部注册，按注册顺序
    pub fn registrations(&self) -> &[Arc<Registration>] {
        &self.registrations
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// 服务的默认注册
    pub fn lookup(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
        select_default(self.registrations.iter().map(|r| ((), r)), key).map(|((), r)| r)
    }

    /// 服务的全部注册，按注册顺序，不含装饰器
    pub fn lookup_all(&self, key: &ServiceKey) -> Vec<Arc<Registration>> {
        self.registrations
            .iter()
            .filter(|r| !r.is_decorator() && r.provides(key))
            .cloned()
            .collect()
    }

    /// 服务的装饰器，按注册顺序
    pub fn decorators_for(&self, key: &ServiceKey) -> Vec<Arc<Registration>> {
        self.registrations
            .iter()
            .filter(|r| r.decorates.as_ref() == Some(key))
            .cloned()
            .collect()
    }

    /// 服务是否已注册
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.registrations
            .iter()
            .any(|r| !r.is_decorator() && r.provides(key))
    }
}

/// 在有序的注册序列中选择默认注册
///
/// 默认注册是最后一个未声明保留已有默认值的注册；全部都声明保留时取第一个。
/// 每个注册附带一个所属信息（作用域等），随结果一并返回。
pub(crate) fn select_default<'r, O>(
    registrations: impl Iterator<Item = (O, &'r Arc<Registration>)>,
    key: &ServiceKey,
) -> Option<(O, Arc<Registration>)> {
    let mut first = None;
    let mut last_default = None;
    for (owner, registration) in registrations {
        if registration.is_decorator() || !registration.provides(key) {
            continue;
        }
        if registration.preserve_existing_defaults {
            if first.is_none() {
                first = Some((owner, Arc::clone(registration)));
            }
        } else {
            last_default = Some((owner, Arc::clone(registration)));
        }
    }
    last_default.or(first)
}
