//! 组件类型目录
//!
//! 配置文件只能以名称引用类型。目录把类型名称映射到强类型的注册函数：
//! 组件名称对应一个 [`RegisterableComponent`]，组件下的服务名称对应从组件到服务的转换，
//! 模块名称对应一个可从 `properties` 反序列化的 [`Module`]。

use crate::configuration::ComponentSettings;
use di_abstractions::RegisterableComponent;
use di_impl::{ContainerBuilder, Module, RegistrationBuilder};
use infrastructure_common::{ConfigError, ConfigResult, DependencyError, DependencyResult, Lifetime};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// 以服务暴露组件的函数，参数为可选的服务名称
type ServiceExposer<C> = Arc<
    dyn for<'b> Fn(RegistrationBuilder<'b, C>, Option<String>) -> RegistrationBuilder<'b, C>
        + Send
        + Sync,
>;

type ServiceMap = HashMap<String, Box<dyn Any + Send + Sync>>;

type ComponentRegistrar = fn(&mut ContainerBuilder, &ComponentSettings, &ServiceMap) -> ConfigResult<()>;

type ModuleLoader = fn(&mut ContainerBuilder, &serde_json::Value) -> DependencyResult<()>;

struct ComponentType {
    register: ComponentRegistrar,
    services: ServiceMap,
}

/// 组件类型目录
#[derive(Default)]
pub struct ComponentTypeCatalog {
    components: HashMap<String, ComponentType>,
    modules: HashMap<String, ModuleLoader>,
}

impl ComponentTypeCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记组件类型
    pub fn component<C: RegisterableComponent>(
        &mut self,
        name: impl Into<String>,
    ) -> ComponentTypeEntry<'_, C> {
        let name = name.into();
        debug!("登记组件类型: {} -> {}", name, std::any::type_name::<C>());
        let component_type = ComponentType {
            register: register_component::<C>,
            services: HashMap::new(),
        };
        let entry = match self.components.entry(name) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(component_type);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(component_type),
        };
        ComponentTypeEntry {
            services: &mut entry.services,
            _component: PhantomData,
        }
    }

    /// 登记模块类型
    pub fn module<M: Module + DeserializeOwned + 'static>(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        debug!("登记模块类型: {} -> {}", name, std::any::type_name::<M>());
        self.modules.insert(name, load_module::<M>);
        self
    }

    /// 组件类型是否已登记
    pub fn contains_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// 模块类型是否已登记
    pub fn contains_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// 按配置注册组件
    pub fn register_component(
        &self,
        builder: &mut ContainerBuilder,
        settings: &ComponentSettings,
    ) -> ConfigResult<()> {
        let component = self
            .components
            .get(&settings.component_type)
            .ok_or_else(|| ConfigError::UnknownType {
                kind: "组件".to_string(),
                name: settings.component_type.clone(),
            })?;
        (component.register)(builder, settings, &component.services)
    }

    /// 按配置加载模块
    pub fn load_module(
        &self,
        builder: &mut ContainerBuilder,
        module_type: &str,
        properties: &serde_json::Value,
    ) -> DependencyResult<()> {
        let load = self.modules.get(module_type).ok_or_else(|| {
            DependencyError::RegistrationError {
                type_name: module_type.to_string(),
                message: ConfigError::UnknownType {
                    kind: "模块".to_string(),
                    name: module_type.to_string(),
                }
                .to_string(),
            }
        })?;
        load(builder, properties)
    }
}

/// 组件类型登记项，用于继续登记组件可暴露的服务
pub struct ComponentTypeEntry<'a, C> {
    services: &'a mut ServiceMap,
    _component: PhantomData<fn() -> C>,
}

impl<'a, C: Send + Sync + 'static> ComponentTypeEntry<'a, C> {
    /// 登记组件可暴露的服务
    pub fn service<S: ?Sized + Send + Sync + 'static>(
        self,
        name: impl Into<String>,
        cast: impl Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
    ) -> Self {
        let cast = Arc::new(cast);
        let expose = exposer::<C, _>(move |registration, key| {
            let cast = Arc::clone(&cast);
            match key {
                Some(key) => registration.named::<S>(key, move |component| cast(component)),
                None => registration.as_service::<S>(move |component| cast(component)),
            }
        });
        self.services.insert(name.into(), Box::new(expose));
        self
    }
}

fn exposer<C, F>(expose: F) -> ServiceExposer<C>
where
    F: for<'b> Fn(RegistrationBuilder<'b, C>, Option<String>) -> RegistrationBuilder<'b, C>
        + Send
        + Sync
        + 'static,
{
    Arc::new(expose)
}

fn register_component<C: RegisterableComponent>(
    builder: &mut ContainerBuilder,
    settings: &ComponentSettings,
    services: &ServiceMap,
) -> ConfigResult<()> {
    let exposers = settings
        .services
        .iter()
        .map(|service| {
            services
                .get(&service.service_type)
                .and_then(|exposer| exposer.downcast_ref::<ServiceExposer<C>>())
                .map(|exposer| (Arc::clone(exposer), service.key.clone()))
                .ok_or_else(|| ConfigError::UnknownType {
                    kind: format!("{} 的服务", settings.component_type),
                    name: service.service_type.clone(),
                })
        })
        .collect::<ConfigResult<Vec<_>>>()?;
    let lifetime = settings
        .instance_scope
        .as_deref()
        .map(str::parse::<Lifetime>)
        .transpose()
        .map_err(|message| ConfigError::ValidationError { message })?;

    let mut registration = builder.register_type::<C>();
    for (expose, key) in exposers {
        registration = expose(registration, key);
    }
    if let Some(lifetime) = lifetime {
        registration = registration.lifetime(lifetime);
    }
    if settings.preserve_existing_defaults {
        registration = registration.preserve_existing_defaults();
    }
    for (name, value) in &settings.parameters {
        registration = registration.with_json_parameter(name.clone(), value.clone());
    }
    debug!("按配置注册组件: {}", settings.component_type);
    Ok(())
}

fn load_module<M: Module + DeserializeOwned>(
    builder: &mut ContainerBuilder,
    properties: &serde_json::Value,
) -> DependencyResult<()> {
    let module: M = serde_json::from_value(properties.clone()).map_err(|error| {
        DependencyError::RegistrationError {
            type_name: std::any::type_name::<M>().to_string(),
            message: format!("模块属性无效: {error}"),
        }
    })?;
    module.load(builder)
}
