//! # 依赖注入具体实现
//!
//! 提供注册目录、构造函数选择、解析引擎、生命周期作用域树和多租户路由。
//!
//! ```ignore
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .register_type::<ConsoleLogger>()
//!     .as_service::<dyn Logger>(|c| c as Arc<dyn Logger>)
//!     .single_instance();
//! let container = builder.build()?;
//!
//! let scope = container.begin_lifetime_scope()?;
//! let logger = scope.resolve::<Arc<dyn Logger>>()?;
//! scope.dispose()?;
//! ```

pub mod builder;
pub mod catalog;
pub mod module;
pub mod multitenant;
pub mod resolver;
pub mod scope;
mod selector;

pub use builder::{ContainerBuilder, RegistrationBuilder};
pub use catalog::{Catalog, Registration};
pub use module::Module;
pub use multitenant::MultitenantContainer;
pub use resolver::ComponentContext;
pub use scope::{Container, LifetimeScope};
