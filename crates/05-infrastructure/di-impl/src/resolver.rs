//! 解析引擎
//!
//! 先按依赖形态分派，再在作用域链中查找注册、选择构造函数、递归解析参数、
//! 依次应用装饰器，最后按生命周期缓存并登记释放。

use crate::catalog::{Activation, Registration};
use crate::scope::{CacheKey, LifetimeScope, ScopeNode};
use crate::selector::select_constructor;
use di_abstractions::{
    Dependency, ErasedConstructor, FactoryActivator, Instance, LazyActivator, NamedArgument,
    Parameter, Resolvable, Resolved, ResolveContext, TypedArgument,
};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime, ServiceKey};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// 委托激活时可用的解析上下文
///
/// 通过它解析的依赖与委托所在的解析链共享循环检测。
pub struct ComponentContext<'a> {
    scope: &'a Arc<ScopeNode>,
    resolve_context: &'a mut ResolveContext,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(scope: &'a Arc<ScopeNode>, resolve_context: &'a mut ResolveContext) -> Self {
        Self {
            scope,
            resolve_context,
        }
    }

    /// 解析依赖
    pub fn resolve<P: Resolvable>(&mut self) -> DependencyResult<P> {
        let resolved = resolve_dependency(self.scope, &P::dependency(), self.resolve_context)?;
        P::from_resolved(resolved)
    }

    /// 解析命名服务
    pub fn resolve_named<S: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
    ) -> DependencyResult<Arc<S>> {
        let key = ServiceKey::named::<S>(name);
        let instance = resolve_service(self.scope, &key, self.resolve_context, &[])?;
        di_abstractions::downcast_instance::<S>(&instance)
    }

    /// 服务是否已注册
    pub fn is_registered<S: ?Sized + 'static>(&self) -> bool {
        self.scope.contains(&ServiceKey::of::<S>())
    }

    /// 当前激活所在的生命周期作用域
    pub fn lifetime_scope(&self) -> LifetimeScope {
        LifetimeScope::from_node(Arc::clone(self.scope))
    }
}

/// 按依赖形态解析
pub(crate) fn resolve_dependency(
    scope: &Arc<ScopeNode>,
    dependency: &Dependency,
    context: &mut ResolveContext,
) -> DependencyResult<Resolved> {
    scope.ensure_active()?;
    match dependency {
        Dependency::Service(key) => resolve_service(scope, key, context, &[]).map(Resolved::Instance),
        Dependency::Lazy(key) => {
            ensure_registered(scope, key)?;
            let (weak, key) = (Arc::downgrade(scope), key.clone());
            let scope_id = scope.info().to_string();
            Ok(Resolved::Lazy(LazyActivator::new(move || {
                let scope = upgrade(&weak, &scope_id)?;
                resolve_service(&scope, &key, &mut ResolveContext::new(), &[])
            })))
        }
        Dependency::Collection(key) => resolve_collection(scope, key, context).map(Resolved::Collection),
        Dependency::Factory { service, .. } => {
            ensure_registered(scope, service)?;
            let (weak, key) = (Arc::downgrade(scope), service.clone());
            let scope_id = scope.info().to_string();
            Ok(Resolved::Factory(FactoryActivator::new(move |arguments| {
                let scope = upgrade(&weak, &scope_id)?;
                resolve_service(&scope, &key, &mut ResolveContext::new(), &arguments)
            })))
        }
    }
}

fn upgrade(scope: &Weak<ScopeNode>, scope_id: &str) -> DependencyResult<Arc<ScopeNode>> {
    scope.upgrade().ok_or_else(|| DependencyError::ScopeDisposed {
        scope_id: scope_id.to_string(),
    })
}

fn ensure_registered(scope: &ScopeNode, key: &ServiceKey) -> DependencyResult<()> {
    if scope.contains(key) {
        Ok(())
    } else {
        Err(DependencyError::UnregisteredService {
            service: key.to_string(),
        })
    }
}

/// 解析服务的默认实现
pub(crate) fn resolve_service(
    scope: &Arc<ScopeNode>,
    key: &ServiceKey,
    context: &mut ResolveContext,
    supplied: &[TypedArgument],
) -> DependencyResult<Instance> {
    scope.ensure_active()?;
    let (owner, registration) =
        scope
            .lookup(key)
            .ok_or_else(|| DependencyError::UnregisteredService {
                service: key.to_string(),
            })?;
    resolve_registration(scope, &owner, &registration, key, context, supplied)
}

/// 解析服务的全部实现，每个实现各自遵循自己的生命周期和装饰器
fn resolve_collection(
    scope: &Arc<ScopeNode>,
    key: &ServiceKey,
    context: &mut ResolveContext,
) -> DependencyResult<Vec<Instance>> {
    scope
        .lookup_all(key)
        .iter()
        .map(|(owner, registration)| resolve_registration(scope, owner, registration, key, context, &[]))
        .collect()
}

fn resolve_registration(
    scope: &Arc<ScopeNode>,
    owner: &Arc<ScopeNode>,
    registration: &Arc<Registration>,
    key: &ServiceKey,
    context: &mut ResolveContext,
    supplied: &[TypedArgument],
) -> DependencyResult<Instance> {
    context.push_frame(key, registration.id)?;
    let result = service_value(scope, owner, registration, key, context, supplied);
    context.pop_frame();
    result
}

fn service_value(
    scope: &Arc<ScopeNode>,
    owner: &Arc<ScopeNode>,
    registration: &Registration,
    key: &ServiceKey,
    context: &mut ResolveContext,
    supplied: &[TypedArgument],
) -> DependencyResult<Instance> {
    // 单例在拥有注册的作用域中激活和缓存，其依赖也在该作用域中解析
    let target = match registration.lifetime {
        Lifetime::SingleInstance => owner,
        Lifetime::PerLifetimeScope | Lifetime::PerDependency => scope,
    };
    let decorators = target.decorators_for(key);

    if !registration.lifetime.is_cached() {
        let component = activate(target, registration, context, supplied)?;
        let value = registration.cast(&component, key)?;
        return decorate(target, key, value, &decorators, context);
    }

    let component_key = CacheKey::Component(registration.id);
    if decorators.is_empty() {
        let component = target.cached(component_key, key, || {
            activate(target, registration, context, supplied)
        })?;
        return registration.cast(&component, key);
    }

    target.cached(CacheKey::Service(registration.id, key.clone()), key, || {
        let component = target.cached(component_key, key, || {
            activate(target, registration, &mut *context, supplied)
        })?;
        let value = registration.cast(&component, key)?;
        decorate(target, key, value, &decorators, context)
    })
}

/// 激活组件并登记释放
fn activate(
    scope: &Arc<ScopeNode>,
    registration: &Registration,
    context: &mut ResolveContext,
    supplied: &[TypedArgument],
) -> DependencyResult<Instance> {
    let component = match &registration.activation {
        Activation::Instance(instance) => instance.clone(),
        Activation::Delegate(delegate) => {
            trace!("委托激活组件: {}", registration.component.name);
            let mut component_context = ComponentContext::new(scope, context);
            delegate(&mut component_context)?
        }
        Activation::Constructors(constructors) => {
            activate_constructor(scope, registration, constructors, context, supplied)?
        }
    };
    if let Some(disposable) = registration.disposable(&component) {
        scope.track(disposable);
    }
    Ok(component)
}

fn activate_constructor(
    scope: &Arc<ScopeNode>,
    registration: &Registration,
    constructors: &[ErasedConstructor],
    context: &mut ResolveContext,
    supplied: &[TypedArgument],
) -> DependencyResult<Instance> {
    let type_name = registration.component.name;
    let constructor = select_constructor(type_name, constructors, |parameter| {
        is_satisfiable(scope, registration, parameter, supplied)
    })?;

    let mut values = Vec::with_capacity(constructor.arity());
    for parameter in &constructor.parameters {
        values.push(bind_parameter(scope, registration, parameter, context, supplied)?);
    }
    debug!("激活组件: {}{}", type_name, constructor.signature());
    constructor.activate(values)
}

fn supplied_for<'s>(parameter: &Parameter, supplied: &'s [TypedArgument]) -> Option<&'s TypedArgument> {
    let Dependency::Service(key) = &parameter.dependency else {
        return None;
    };
    supplied
        .iter()
        .find(|argument| argument.key.type_id() == key.type_id())
}

fn named_for<'r>(parameter: &Parameter, registration: &'r Registration) -> Option<&'r NamedArgument> {
    if !matches!(parameter.dependency, Dependency::Service(_)) {
        return None;
    }
    registration
        .parameters
        .iter()
        .find(|argument| argument.name == parameter.name)
}

fn can_resolve(scope: &ScopeNode, dependency: &Dependency) -> bool {
    match dependency {
        Dependency::Service(key) | Dependency::Lazy(key) => scope.contains(key),
        Dependency::Factory { service, .. } => scope.contains(service),
        Dependency::Collection(_) => true,
    }
}

/// 参数是否可满足
///
/// 可满足指参数可由调用方提供的类型化参数、注册的命名参数、容器中的注册或默认值之一提供。
fn is_satisfiable(
    scope: &ScopeNode,
    registration: &Registration,
    parameter: &Parameter,
    supplied: &[TypedArgument],
) -> bool {
    supplied_for(parameter, supplied).is_some()
        || named_for(parameter, registration).is_some()
        || can_resolve(scope, &parameter.dependency)
        || parameter.is_optional()
}

/// 按优先级绑定参数：类型化参数、命名参数、容器解析、默认值
fn bind_parameter(
    scope: &Arc<ScopeNode>,
    registration: &Registration,
    parameter: &Parameter,
    context: &mut ResolveContext,
    supplied: &[TypedArgument],
) -> DependencyResult<Resolved> {
    if let Some(argument) = supplied_for(parameter, supplied) {
        return Ok(Resolved::Instance(argument.value.clone()));
    }
    if let Some(argument) = named_for(parameter, registration) {
        let instance = argument
            .value
            .to_instance(parameter.dependency.service_key())?;
        return Ok(Resolved::Instance(instance));
    }
    if can_resolve(scope, &parameter.dependency) {
        return resolve_dependency(scope, &parameter.dependency, context);
    }
    if let Some(default) = &parameter.default {
        return Ok(default());
    }
    Err(DependencyError::UnregisteredService {
        service: parameter.dependency.to_string(),
    })
}

/// 按注册顺序依次应用装饰器，装饰器中类型为服务类型的参数绑定到上一层的值
fn decorate(
    scope: &Arc<ScopeNode>,
    key: &ServiceKey,
    value: Instance,
    decorators: &[Arc<Registration>],
    context: &mut ResolveContext,
) -> DependencyResult<Instance> {
    let mut current = value;
    for decorator in decorators {
        context.push_frame(key, decorator.id)?;
        let inner = TypedArgument {
            key: ServiceKey {
                type_info: key.type_info.clone(),
                name: None,
            },
            value: current,
        };
        let result = activate(scope, decorator, context, std::slice::from_ref(&inner))
            .and_then(|component| decorator.cast(&component, key));
        context.pop_frame();
        current = result?;
        trace!("应用装饰器: {} -> {}", decorator.component.name, key);
    }
    Ok(current)
}
