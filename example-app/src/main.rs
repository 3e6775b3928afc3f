//! # 示例应用程序
//!
//! 演示配置驱动注册、生命周期作用域和多租户路由

mod services;

use clap::Parser;
use di_abstractions::AmbientTenantIdentificationStrategy;
use di_impl::{Container, MultitenantContainer};
use infrastructure_common::AmbientContext;
use infrastructure_composition::{InfrastructureBuilder, LoggingConfig};
use services::{Connection, Greeter, GreetingService, ShoutingGreeter};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// 环境上下文中保存租户标识的键
const TENANT_KEY: &str = "tenant";

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Lorn ADSP 依赖注入示例应用")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config/app.json")]
    config: String,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 使用 JSON 格式输出日志
    #[arg(long)]
    json_logs: bool,

    /// 模拟请求的租户，空字符串表示未识别租户
    #[arg(short, long, default_values_t = ["acme".to_string(), "globex".to_string(), String::new()])]
    tenant: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = args
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    let logging = if args.json_logs {
        LoggingConfig::production()
    } else {
        LoggingConfig::development()
    }
    .with_level(level);

    let container = build_container(&args, logging)?;
    let tenants = MultitenantContainer::new(
        AmbientTenantIdentificationStrategy::new(TENANT_KEY),
        container,
    );
    configure_tenants(&tenants)?;
    let tenants = Arc::new(tenants);

    let root = AmbientContext::new().with_value("request-source", "example-app");
    let mut requests = Vec::new();
    for tenant in &args.tenant {
        let context = if tenant.is_empty() {
            root.clone()
        } else {
            root.with_value(TENANT_KEY, tenant.as_str())
        };
        let container = Arc::clone(&tenants);
        requests.push(context.spawn_task(move |context| async move {
            handle_request(&container, &context)
        }));
    }

    for request in requests {
        match request.await? {
            Ok(greeting) => info!("请求完成: {}", greeting),
            Err(error) => warn!("请求失败: {}", error),
        }
    }

    tenants.dispose()?;
    info!("应用已关闭");
    Ok(())
}

/// 构建根容器
fn build_container(args: &Args, logging: LoggingConfig) -> anyhow::Result<Container> {
    let mut builder = InfrastructureBuilder::new()
        .with_logging(logging)
        .with_component_types(services::component_types())
        .with_config_section("container")
        .configure(services::register_services);

    if Path::new(&args.config).exists() {
        builder = if args.config.ends_with(".toml") {
            builder.add_config_toml(&args.config)?
        } else if args.config.ends_with(".yaml") || args.config.ends_with(".yml") {
            builder.add_config_yaml(&args.config)?
        } else {
            builder.add_config_json(&args.config)?
        };
    } else {
        info!("配置文件不存在，只使用代码注册: {}", args.config);
    }

    let container = builder.add_config_env_vars("ADSP").build()?;
    Ok(container)
}

/// 配置租户的覆盖注册
fn configure_tenants(tenants: &MultitenantContainer) -> anyhow::Result<()> {
    tenants.configure_tenant("acme", |builder| {
        builder
            .register_type::<GreetingService>()
            .as_service::<dyn Greeter>(|g| g as Arc<dyn Greeter>)
            .with_parameter("salutation", "Welcome".to_string());
    })?;
    tenants.configure_tenant("globex", |builder| {
        builder.register_decorator::<ShoutingGreeter, dyn Greeter>(|g| g as Arc<dyn Greeter>);
    })?;
    Ok(())
}

/// 在租户作用域中处理一次请求
fn handle_request(tenants: &MultitenantContainer, context: &AmbientContext) -> anyhow::Result<String> {
    let scope = tenants.begin_lifetime_scope(context)?;
    let connection = scope.resolve::<Arc<Connection>>()?;
    let greeter = scope.resolve::<Arc<dyn Greeter>>()?;

    let name = context.get(TENANT_KEY).unwrap_or("访客");
    let greeting = greeter.greet(name);

    scope.dispose()?;
    debug_assert!(!connection.is_open());
    Ok(greeting)
}
