//! # 基础设施组合层
//!
//! 这个 crate 负责把配置源、组件类型和代码注册组合成一个可用的根容器。
//!
//! ## 主要功能
//!
//! - **基础设施构建器**: 汇集配置文件、环境变量和代码注册
//! - **配置驱动注册**: 按配置中的类型名称注册组件和加载模块
//! - **日志初始化**: 基于 `tracing-subscriber` 的开发/生产日志配置
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::{ComponentTypeCatalog, InfrastructureBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let types = ComponentTypeCatalog::new();
//!
//!     let container = InfrastructureBuilder::new()
//!         .add_config_json("appsettings.json")?
//!         .with_config_section("container")
//!         .with_component_types(types)
//!         .build()?;
//!
//!     let scope = container.begin_lifetime_scope()?;
//!     scope.dispose()?;
//!     container.dispose()?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod configuration;
pub mod type_catalog;


// 重新导出主要类型
pub use builder::{init_logging, InfrastructureBuilder, LoggingConfig};
pub use configuration::{
    ComponentSettings, ConfigurationModule, ContainerSettings, ModuleSettings, ServiceSettings,
};
pub use type_catalog::{ComponentTypeCatalog, ComponentTypeEntry};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
