//! 容器构建器
//!
//! 以流式 API 收集组件注册，`build` 时分配注册标识并封存为只读目录。

use crate::catalog::{
    next_registration_id, Activation, Caster, Catalog, DelegateActivator, Disposer, Registration,
    ServiceBinding,
};
use crate::module::Module;
use crate::resolver::ComponentContext;
use crate::scope::LifetimeScope;
use di_abstractions::{
    downcast_instance, instance_of, ConstructorDescriptor, Disposable, Instance, NamedArgument,
    ParameterValue, RegisterableComponent, TypedArgument,
};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime, ServiceKey, TypeInfo};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

/// 尚未封存的注册
struct PendingRegistration {
    component: TypeInfo,
    services: Vec<ServiceBinding>,
    self_binding: ServiceBinding,
    activation: Activation,
    lifetime: Lifetime,
    decorates: Option<ServiceKey>,
    preserve_existing_defaults: bool,
    parameters: Vec<NamedArgument>,
    disposer: Option<Disposer>,
}

impl PendingRegistration {
    fn new<C: Send + Sync + 'static>(activation: Activation, lifetime: Lifetime) -> Self {
        Self {
            component: TypeInfo::of::<C>(),
            services: Vec::new(),
            self_binding: binding::<C, C, _>(ServiceKey::of::<C>(), |component| component),
            activation,
            lifetime,
            decorates: None,
            preserve_existing_defaults: false,
            parameters: Vec::new(),
            disposer: None,
        }
    }

    fn seal(self) -> DependencyResult<Registration> {
        if let Activation::Constructors(constructors) = &self.activation {
            if constructors.is_empty() {
                return Err(DependencyError::RegistrationError {
                    type_name: self.component.name.to_string(),
                    message: "组件没有声明任何构造函数".to_string(),
                });
            }
        }
        let services = if self.services.is_empty() {
            vec![self.self_binding]
        } else {
            self.services
        };
        // 实例只能激活一次，释放也只能登记一次
        let lifetime = match self.activation {
            Activation::Instance(_) => Lifetime::SingleInstance,
            _ => self.lifetime,
        };
        Ok(Registration {
            id: next_registration_id(),
            component: self.component,
            services,
            activation: self.activation,
            lifetime,
            decorates: self.decorates,
            preserve_existing_defaults: self.preserve_existing_defaults,
            parameters: self.parameters,
            disposer: self.disposer,
        })
    }
}

fn binding<C, S, F>(key: ServiceKey, cast: F) -> ServiceBinding
where
    C: Send + Sync + 'static,
    S: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
{
    let caster: Caster = Arc::new(move |instance: &Instance| {
        let component = downcast_instance::<C>(instance)?;
        Ok(instance_of(cast(component)))
    });
    ServiceBinding { key, caster }
}

fn dispose_component<C: Disposable + 'static>(instance: &Instance) -> Option<Arc<dyn Disposable>> {
    downcast_instance::<C>(instance)
        .ok()
        .map(|component| component as Arc<dyn Disposable>)
}

/// 容器构建器
#[derive(Default)]
pub struct ContainerBuilder {
    registrations: Vec<PendingRegistration>,
    errors: Vec<DependencyError>,
}

impl ContainerBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    fn push<C>(&mut self, registration: PendingRegistration) -> RegistrationBuilder<'_, C> {
        debug!("注册组件: {}", registration.component.name);
        self.registrations.push(registration);
        let index = self.registrations.len() - 1;
        RegistrationBuilder {
            registration: &mut self.registrations[index],
            _component: PhantomData,
        }
    }

    /// 注册按构造函数激活的组件
    pub fn register_type<C: RegisterableComponent>(&mut self) -> RegistrationBuilder<'_, C> {
        self.register_constructors(C::constructors())
            .lifetime(C::default_lifetime())
    }

    /// 以给定的构造函数列表注册组件
    pub fn register_constructors<C: Send + Sync + 'static>(
        &mut self,
        constructors: Vec<ConstructorDescriptor<C>>,
    ) -> RegistrationBuilder<'_, C> {
        let constructors = constructors
            .into_iter()
            .map(ConstructorDescriptor::into_erased)
            .collect();
        self.push(PendingRegistration::new::<C>(
            Activation::Constructors(constructors),
            Lifetime::PerDependency,
        ))
    }

    /// 注册预先创建的实例，实例总是单例
    pub fn register_instance<C: Send + Sync + 'static>(
        &mut self,
        instance: C,
    ) -> RegistrationBuilder<'_, C> {
        self.push(PendingRegistration::new::<C>(
            Activation::Instance(instance_of(Arc::new(instance))),
            Lifetime::SingleInstance,
        ))
    }

    /// 注册由委托创建的组件
    pub fn register<C, F>(&mut self, factory: F) -> RegistrationBuilder<'_, C>
    where
        C: Send + Sync + 'static,
        F: Fn(&mut ComponentContext<'_>) -> DependencyResult<C> + Send + Sync + 'static,
    {
        let activator: DelegateActivator = Arc::new(move |context: &mut ComponentContext<'_>| {
            factory(context).map(|component| instance_of(Arc::new(component)))
        });
        self.push(PendingRegistration::new::<C>(
            Activation::Delegate(activator),
            Lifetime::PerDependency,
        ))
    }

    /// 注册服务 `S` 的装饰器
    ///
    /// 装饰器构造函数中类型为 `S` 的参数绑定到被装饰的值。多个装饰器按注册顺序依次包装。
    pub fn register_decorator<D, S>(
        &mut self,
        cast: impl Fn(Arc<D>) -> Arc<S> + Send + Sync + 'static,
    ) -> &mut Self
    where
        D: RegisterableComponent,
        S: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<S>();
        let registration = self.register_type::<D>().registration;
        registration.services = vec![binding(key.clone(), cast)];
        registration.decorates = Some(key);
        registration.lifetime = Lifetime::PerDependency;
        self
    }

    /// 加载模块
    ///
    /// 模块加载失败时错误会在 [`ContainerBuilder::build`] 时返回。
    pub fn register_module<M: Module>(&mut self, module: M) -> &mut Self {
        debug!("加载模块: {}", module.name());
        if let Err(error) = module.load(self) {
            self.errors.push(error);
        }
        self
    }

    /// 已收集的注册数量
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// 封存为注册目录
    pub(crate) fn into_catalog(self) -> DependencyResult<Catalog> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }
        let mut catalog = Catalog::new();
        for registration in self.registrations {
            catalog.register(registration.seal()?);
        }
        Ok(catalog)
    }

    /// 构建容器
    pub fn build(self) -> DependencyResult<LifetimeScope> {
        let catalog = self.into_catalog()?;
        info!("容器构建完成, 注册数量: {}", catalog.len());
        Ok(LifetimeScope::root(catalog))
    }
}

/// 单个注册的流式配置
pub struct RegistrationBuilder<'a, C> {
    registration: &'a mut PendingRegistration,
    _component: PhantomData<fn() -> C>,
}

impl<'a, C: Send + Sync + 'static> RegistrationBuilder<'a, C> {
    /// 以服务 `S` 暴露组件
    pub fn as_service<S: ?Sized + Send + Sync + 'static>(
        self,
        cast: impl Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
    ) -> Self {
        self.registration
            .services
            .push(binding(ServiceKey::of::<S>(), cast));
        self
    }

    /// 以命名服务 `S` 暴露组件
    pub fn named<S: ?Sized + Send + Sync + 'static>(
        self,
        name: impl Into<String>,
        cast: impl Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
    ) -> Self {
        self.registration
            .services
            .push(binding(ServiceKey::named::<S>(name), cast));
        self
    }

    /// 以组件自身类型暴露
    pub fn as_self(self) -> Self {
        let binding = self.registration.self_binding.clone();
        self.registration.services.push(binding);
        self
    }

    pub fn lifetime(self, lifetime: Lifetime) -> Self {
        self.registration.lifetime = lifetime;
        self
    }

    pub fn single_instance(self) -> Self {
        self.lifetime(Lifetime::SingleInstance)
    }

    pub fn instance_per_lifetime_scope(self) -> Self {
        self.lifetime(Lifetime::PerLifetimeScope)
    }

    pub fn instance_per_dependency(self) -> Self {
        self.lifetime(Lifetime::PerDependency)
    }

    /// 不覆盖已有的默认注册，只追加到集合中
    pub fn preserve_existing_defaults(self) -> Self {
        self.registration.preserve_existing_defaults = true;
        self
    }

    /// 为名为 `name` 的构造函数参数提供值
    pub fn with_parameter<T: Send + Sync + 'static>(self, name: impl Into<String>, value: T) -> Self {
        self.registration.parameters.push(NamedArgument {
            name: name.into(),
            value: ParameterValue::Typed(TypedArgument::new(value)),
        });
        self
    }

    /// 以 JSON 值为构造函数参数提供值，绑定时转换为参数类型
    pub fn with_json_parameter(self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.registration.parameters.push(NamedArgument {
            name: name.into(),
            value: ParameterValue::Json(value),
        });
        self
    }
}

impl<'a, C: Disposable + 'static> RegistrationBuilder<'a, C> {
    /// 由创建实例的作用域负责释放
    pub fn disposable(self) -> Self {
        self.registration.disposer = Some(dispose_component::<C> as Disposer);
        self
    }
}
