//! 配置驱动的注册
//!
//! 配置结构：
//!
//! ```json
//! {
//!   "components": [
//!     {
//!       "type": "ConsoleLogger",
//!       "services": [ { "type": "Logger", "key": "console" } ],
//!       "instance_scope": "single-instance",
//!       "preserve_existing_defaults": false,
//!       "parameters": { "prefix": "[app]" }
//!     }
//!   ],
//!   "modules": [ { "type": "AuditModule", "properties": { "level": 2 } } ]
//! }
//! ```
//!
//! 类型名称通过 [`ComponentTypeCatalog`] 解析为具体类型。

use crate::type_catalog::ComponentTypeCatalog;
use config::Config;
use di_impl::{ContainerBuilder, Module};
use infrastructure_common::{ConfigError, ConfigResult, DependencyError, DependencyResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 容器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSettings {
    #[serde(default)]
    pub components: Vec<ComponentSettings>,
    #[serde(default)]
    pub modules: Vec<ModuleSettings>,
}

/// 单个组件的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSettings {
    /// 组件类型名称
    #[serde(rename = "type")]
    pub component_type: String,
    /// 暴露的服务，为空时以组件自身类型暴露
    #[serde(default)]
    pub services: Vec<ServiceSettings>,
    /// 生命周期，缺省时使用组件声明的默认值
    #[serde(default)]
    pub instance_scope: Option<String>,
    #[serde(default)]
    pub preserve_existing_defaults: bool,
    /// 按名称绑定的构造函数参数
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

/// 组件暴露的服务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(rename = "type")]
    pub service_type: String,
    /// 服务名称
    #[serde(default)]
    pub key: Option<String>,
}

/// 模块配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSettings {
    #[serde(rename = "type")]
    pub module_type: String,
    /// 反序列化为模块本身的属性
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
}

pub(crate) fn parse_error(error: config::ConfigError) -> ConfigError {
    ConfigError::ParseError {
        source: Box::new(error),
    }
}

/// 从配置加载注册的模块
pub struct ConfigurationModule {
    settings: ContainerSettings,
    types: Arc<ComponentTypeCatalog>,
}

impl ConfigurationModule {
    /// 以整个配置为容器配置
    pub fn new(config: &Config, types: Arc<ComponentTypeCatalog>) -> ConfigResult<Self> {
        let settings = config
            .clone()
            .try_deserialize::<ContainerSettings>()
            .map_err(parse_error)?;
        Ok(Self::from_settings(settings, types))
    }

    /// 以配置中的某一节为容器配置，节不存在时不注册任何组件
    pub fn from_section(
        config: &Config,
        section: &str,
        types: Arc<ComponentTypeCatalog>,
    ) -> ConfigResult<Self> {
        let settings = match config.get::<ContainerSettings>(section) {
            Ok(settings) => settings,
            Err(config::ConfigError::NotFound(_)) => {
                debug!("配置节不存在: {}", section);
                ContainerSettings::default()
            }
            Err(error) => return Err(parse_error(error)),
        };
        Ok(Self::from_settings(settings, types))
    }

    pub fn from_settings(settings: ContainerSettings, types: Arc<ComponentTypeCatalog>) -> Self {
        Self { settings, types }
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }
}

impl Module for ConfigurationModule {
    fn load(&self, builder: &mut ContainerBuilder) -> DependencyResult<()> {
        for component in &self.settings.components {
            self.types
                .register_component(builder, component)
                .map_err(|error| DependencyError::RegistrationError {
                    type_name: component.component_type.clone(),
                    message: error.to_string(),
                })?;
        }
        for module in &self.settings.modules {
            let properties = module
                .properties
                .clone()
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
            debug!("按配置加载模块: {}", module.module_type);
            self.types
                .load_module(builder, &module.module_type, &properties)?;
        }
        info!(
            "配置注册完成, 组件: {}, 模块: {}",
            self.settings.components.len(),
            self.settings.modules.len()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "ConfigurationModule"
    }
}
