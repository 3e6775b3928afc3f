//! 示例组件

use component_macros::Injectable;
use di_abstractions::Disposable;
use di_impl::{ContainerBuilder, Module};
use infrastructure_common::{BoxError, DependencyResult};
use infrastructure_composition::ComponentTypeCatalog;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// 日志输出
pub trait Logger: Send + Sync {
    fn write(&self, message: &str);
}

/// 问候服务
pub trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

#[derive(Injectable)]
#[injectable(single_instance)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn write(&self, message: &str) {
        info!("{}", message);
    }
}

/// 带前缀的日志输出，前缀通常来自配置
#[derive(Injectable)]
pub struct PrefixLogger {
    prefix: String,
}

impl Logger for PrefixLogger {
    fn write(&self, message: &str) {
        info!("{} {}", self.prefix, message);
    }
}

#[derive(Injectable)]
pub struct GreetingService {
    logger: Arc<dyn Logger>,
    #[inject(default = String::from("你好"))]
    salutation: String,
}

impl Greeter for GreetingService {
    fn greet(&self, name: &str) -> String {
        let greeting = format!("{}, {}!", self.salutation, name);
        self.logger.write(&greeting);
        greeting
    }
}

/// 把内层问候转为大写的装饰器
#[derive(Injectable)]
pub struct ShoutingGreeter {
    inner: Arc<dyn Greeter>,
}

impl Greeter for ShoutingGreeter {
    fn greet(&self, name: &str) -> String {
        self.inner.greet(name).to_uppercase()
    }
}

/// 每个请求作用域一个的连接，作用域释放时关闭
pub struct Connection {
    name: String,
    open: AtomicBool,
}

impl Connection {
    pub fn open(name: impl Into<String>) -> Self {
        let name = name.into();
        info!("打开连接: {}", name);
        Self {
            name,
            open: AtomicBool::new(true),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Disposable for Connection {
    fn dispose(&self) -> Result<(), BoxError> {
        if self.open.swap(false, Ordering::SeqCst) {
            info!("关闭连接: {}", self.name);
        }
        Ok(())
    }
}

/// 审计模块，属性来自配置
#[derive(Debug, Deserialize)]
pub struct AuditModule {
    #[serde(default)]
    enabled: bool,
}

impl Module for AuditModule {
    fn load(&self, builder: &mut ContainerBuilder) -> DependencyResult<()> {
        if self.enabled {
            builder
                .register_type::<PrefixLogger>()
                .named::<dyn Logger>("audit", |l| l as Arc<dyn Logger>)
                .with_parameter("prefix", "[audit]".to_string())
                .single_instance();
        }
        Ok(())
    }
}

/// 配置文件中可引用的类型
pub fn component_types() -> ComponentTypeCatalog {
    let mut types = ComponentTypeCatalog::new();
    types
        .component::<TracingLogger>("TracingLogger")
        .service::<dyn Logger>("Logger", |l| l as Arc<dyn Logger>);
    types
        .component::<PrefixLogger>("PrefixLogger")
        .service::<dyn Logger>("Logger", |l| l as Arc<dyn Logger>);
    types
        .component::<GreetingService>("GreetingService")
        .service::<dyn Greeter>("Greeter", |g| g as Arc<dyn Greeter>);
    types.module::<AuditModule>("AuditModule");
    types
}

/// 代码注册
pub fn register_services(builder: &mut ContainerBuilder) {
    builder
        .register_type::<TracingLogger>()
        .as_service::<dyn Logger>(|l| l as Arc<dyn Logger>);
    builder
        .register_type::<GreetingService>()
        .as_service::<dyn Greeter>(|g| g as Arc<dyn Greeter>);
    builder
        .register(|context| {
            let scope = context.lifetime_scope();
            Ok(Connection::open(scope.info().tag.clone()))
        })
        .instance_per_lifetime_scope()
        .disposable();
}
