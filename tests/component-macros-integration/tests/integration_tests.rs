//! `#[derive(Injectable)]` 集成测试

use component_macros::Injectable;
use di_abstractions::{Factory, Lazy, RegisterableComponent};
use di_impl::ContainerBuilder;
use infrastructure_common::{DependencyError, Lifetime};
use std::sync::Arc;

trait Logger: Send + Sync {
    fn name(&self) -> &str;
}

trait Handler: Send + Sync {
    fn handle(&self) -> u32;
}

#[derive(Injectable)]
#[injectable(single_instance)]
struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn name(&self) -> &str {
        "console"
    }
}

#[derive(Injectable)]
#[injectable(transient)]
struct PrefixedLogger {
    prefix: String,
}

impl Logger for PrefixedLogger {
    fn name(&self) -> &str {
        &self.prefix
    }
}

#[derive(Injectable)]
struct DoubleHandler;

impl Handler for DoubleHandler {
    fn handle(&self) -> u32 {
        2
    }
}

#[derive(Injectable)]
#[injectable(per_lifetime_scope)]
struct Clock {
    offset: i64,
}

#[derive(Injectable)]
struct OrderService {
    logger: Arc<dyn Logger>,
    #[inject(named = "audit")]
    audit: Arc<dyn Logger>,
    #[inject(default = 30)]
    timeout_secs: u64,
    handlers: Vec<Arc<dyn Handler>>,
    clock: Lazy<Clock>,
    invoices: Factory<(i32,), Invoice>,
}

#[derive(Injectable)]
struct Invoice {
    number: i32,
    logger: Arc<dyn Logger>,
}

fn builder() -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();
    builder
        .register_type::<ConsoleLogger>()
        .as_service::<dyn Logger>(|l| l as Arc<dyn Logger>);
    builder
        .register_type::<PrefixedLogger>()
        .named::<dyn Logger>("audit", |l| l as Arc<dyn Logger>)
        .with_parameter("prefix", "audit".to_string());
    builder
        .register_type::<DoubleHandler>()
        .as_service::<dyn Handler>(|h| h as Arc<dyn Handler>);
    builder.register_type::<Clock>().with_parameter("offset", 8_i64);
    builder.register_type::<Invoice>();
    builder.register_type::<OrderService>();
    builder
}

#[test]
fn test_lifetime_attribute_sets_default_lifetime() {
    assert_eq!(ConsoleLogger::default_lifetime(), Lifetime::SingleInstance);
    assert_eq!(PrefixedLogger::default_lifetime(), Lifetime::PerDependency);
    assert_eq!(Clock::default_lifetime(), Lifetime::PerLifetimeScope);
    assert_eq!(OrderService::default_lifetime(), Lifetime::PerDependency);
}

#[test]
fn test_fields_become_parameters_in_declaration_order() {
    let constructors = OrderService::constructors();
    assert_eq!(constructors.len(), 1);

    let names: Vec<&str> = constructors[0]
        .parameters()
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["logger", "audit", "timeout_secs", "handlers", "clock", "invoices"]
    );

    let optional: Vec<bool> = constructors[0]
        .parameters()
        .iter()
        .map(|p| p.is_optional())
        .collect();
    assert_eq!(optional, vec![false, false, true, false, false, false]);
}

#[test]
fn test_unit_struct_has_parameterless_constructor() {
    let constructors = DoubleHandler::constructors();
    assert_eq!(constructors.len(), 1);
    assert!(constructors[0].parameters().is_empty());
}

#[test]
fn test_derived_component_is_fully_resolved() {
    let container = builder().build().unwrap();

    let service = container.resolve::<Arc<OrderService>>().unwrap();

    assert_eq!(service.logger.name(), "console");
    assert_eq!(service.audit.name(), "audit");
    assert_eq!(service.timeout_secs, 30);
    assert_eq!(service.handlers.iter().map(|h| h.handle()).sum::<u32>(), 2);
    assert!(!service.clock.is_value_created());
    assert_eq!(service.clock.value().unwrap().offset, 8);

    let invoice = service.invoices.invoke((1001,)).unwrap();
    assert_eq!(invoice.number, 1001);
    assert_eq!(invoice.logger.name(), "console");
}

#[test]
fn test_default_field_can_be_overridden() {
    let mut builder = builder();
    builder
        .register_type::<OrderService>()
        .with_parameter("timeout_secs", 5_u64);
    let container = builder.build().unwrap();

    let service = container.resolve::<Arc<OrderService>>().unwrap();
    assert_eq!(service.timeout_secs, 5);
}

#[test]
fn test_single_instance_attribute_is_honoured() {
    let container = builder().build().unwrap();
    let scope = container.begin_lifetime_scope().unwrap();

    let a = container.resolve::<Arc<dyn Logger>>().unwrap();
    let b = scope.resolve::<Arc<dyn Logger>>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_missing_named_dependency_leaves_no_viable_constructor() {
    let mut builder = ContainerBuilder::new();
    builder
        .register_type::<ConsoleLogger>()
        .as_service::<dyn Logger>(|l| l as Arc<dyn Logger>);
    builder.register_type::<OrderService>();
    let container = builder.build().unwrap();

    let error = container.resolve::<Arc<OrderService>>().err().unwrap();
    assert!(matches!(error, DependencyError::NoViableConstructor { .. }));
}
