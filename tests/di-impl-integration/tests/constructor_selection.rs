//! 构造函数选择集成测试

use chrono::{DateTime, TimeZone, Utc};
use di_abstractions::{ConstructorDescriptor, RegisterableComponent};
use di_impl::ContainerBuilder;
use infrastructure_common::DependencyError;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum Chosen {
    Default,
    Name(String),
    CountAndName(i32, String),
    Counts(i32, i32),
    Full(i32, String, DateTime<Utc>, i64),
}

/// 与原测试套件中的 ComplexConstructorService 对应
struct ComplexConstructorService {
    chosen: Chosen,
}

fn default_constructor<T: Send + Sync + 'static>(
    make: fn(Chosen) -> T,
) -> ConstructorDescriptor<T> {
    ConstructorDescriptor::new(move |_| Ok(make(Chosen::Default)))
}

fn name_constructor<T: Send + Sync + 'static>(make: fn(Chosen) -> T) -> ConstructorDescriptor<T> {
    ConstructorDescriptor::new(move |args| Ok(make(Chosen::Name(args.value::<String>()?))))
        .parameter::<Arc<String>>("name")
}

fn count_and_name_constructor<T: Send + Sync + 'static>(
    make: fn(Chosen) -> T,
) -> ConstructorDescriptor<T> {
    ConstructorDescriptor::new(move |args| {
        let count = args.value::<i32>()?;
        let name = args.value::<String>()?;
        Ok(make(Chosen::CountAndName(count, name)))
    })
    .parameter::<Arc<i32>>("count")
    .parameter::<Arc<String>>("name")
}

impl RegisterableComponent for ComplexConstructorService {
    fn constructors() -> Vec<ConstructorDescriptor<Self>> {
        let make = |chosen| Self { chosen };
        vec![
            default_constructor(make),
            name_constructor(make),
            count_and_name_constructor(make),
        ]
    }
}

/// 额外声明 `(i32, i32)`，与 `(i32, String)` 参数数量相同
struct AmbiguousConstructorService {
    chosen: Chosen,
}

impl RegisterableComponent for AmbiguousConstructorService {
    fn constructors() -> Vec<ConstructorDescriptor<Self>> {
        let make = |chosen| Self { chosen };
        vec![
            default_constructor(make),
            name_constructor(make),
            count_and_name_constructor(make),
            ConstructorDescriptor::new(move |args| {
                let left = args.value::<i32>()?;
                let right = args.value::<i32>()?;
                Ok(make(Chosen::Counts(left, right)))
            })
            .parameter::<Arc<i32>>("left")
            .parameter::<Arc<i32>>("right"),
        ]
    }
}

/// 带可选 `i64` 参数的最长构造函数
struct ScheduledService {
    chosen: Chosen,
}

impl RegisterableComponent for ScheduledService {
    fn constructors() -> Vec<ConstructorDescriptor<Self>> {
        let make = |chosen| Self { chosen };
        vec![
            default_constructor(make),
            count_and_name_constructor(make),
            ConstructorDescriptor::new(move |args| {
                let count = args.value::<i32>()?;
                let name = args.value::<String>()?;
                let at = args.value::<DateTime<Utc>>()?;
                let ticks = args.value::<i64>()?;
                Ok(make(Chosen::Full(count, name, at, ticks)))
            })
            .parameter::<Arc<i32>>("count")
            .parameter::<Arc<String>>("name")
            .parameter::<Arc<DateTime<Utc>>>("at")
            .optional::<Arc<i64>, _>("ticks", || Arc::new(0)),
        ]
    }
}

struct RequiresCount {
    count: i32,
}

impl RegisterableComponent for RequiresCount {
    fn constructors() -> Vec<ConstructorDescriptor<Self>> {
        vec![ConstructorDescriptor::new(|args| {
            Ok(Self {
                count: args.value::<i32>()?,
            })
        })
        .parameter::<Arc<i32>>("count")]
    }
}

fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
}

#[test]
fn test_default_constructor_when_nothing_registered() {
    let mut builder = ContainerBuilder::new();
    builder.register_type::<ComplexConstructorService>();
    let container = builder.build().unwrap();

    let service = container.resolve::<Arc<ComplexConstructorService>>().unwrap();
    assert_eq!(service.chosen, Chosen::Default);
}

#[test]
fn test_single_parameter_constructor_when_string_registered() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance("alpha".to_string());
    builder.register_type::<ComplexConstructorService>();
    let container = builder.build().unwrap();

    let service = container.resolve::<Arc<ComplexConstructorService>>().unwrap();
    assert_eq!(service.chosen, Chosen::Name("alpha".to_string()));
}

#[test]
fn test_most_parameters_constructor_is_chosen() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance(7_i32);
    builder.register_instance("alpha".to_string());
    builder.register_type::<ComplexConstructorService>();
    let container = builder.build().unwrap();

    let service = container.resolve::<Arc<ComplexConstructorService>>().unwrap();
    assert_eq!(service.chosen, Chosen::CountAndName(7, "alpha".to_string()));
}

#[test]
fn test_equal_arity_constructors_are_ambiguous() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance(7_i32);
    builder.register_instance("alpha".to_string());
    builder.register_type::<AmbiguousConstructorService>();
    let container = builder.build().unwrap();

    let error = container
        .resolve::<Arc<AmbiguousConstructorService>>()
        .err()
        .unwrap();
    match error {
        DependencyError::AmbiguousConstructor {
            type_name,
            candidates,
        } => {
            assert!(type_name.contains("AmbiguousConstructorService"));
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("意外的错误: {other}"),
    }
}

#[test]
fn test_ambiguity_only_counts_satisfiable_constructors() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance(7_i32);
    builder.register_type::<AmbiguousConstructorService>();
    let container = builder.build().unwrap();

    let service = container
        .resolve::<Arc<AmbiguousConstructorService>>()
        .unwrap();
    assert_eq!(service.chosen, Chosen::Counts(7, 7));
}

#[test]
fn test_optional_parameter_uses_default_value() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance(7_i32);
    builder.register_instance("alpha".to_string());
    builder.register_instance(timestamp());
    builder.register_type::<ScheduledService>();
    let container = builder.build().unwrap();

    let service = container.resolve::<Arc<ScheduledService>>().unwrap();
    assert_eq!(
        service.chosen,
        Chosen::Full(7, "alpha".to_string(), timestamp(), 0)
    );
}

#[test]
fn test_optional_parameter_prefers_registered_value() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance(7_i32);
    builder.register_instance(99_i64);
    builder.register_instance("alpha".to_string());
    builder.register_instance(timestamp());
    builder.register_type::<ScheduledService>();
    let container = builder.build().unwrap();

    let service = container.resolve::<Arc<ScheduledService>>().unwrap();
    assert_eq!(
        service.chosen,
        Chosen::Full(7, "alpha".to_string(), timestamp(), 99)
    );
}

#[test]
fn test_longest_constructor_skipped_without_its_dependency() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance(7_i32);
    builder.register_instance("alpha".to_string());
    builder.register_type::<ScheduledService>();
    let container = builder.build().unwrap();

    let service = container.resolve::<Arc<ScheduledService>>().unwrap();
    assert_eq!(service.chosen, Chosen::CountAndName(7, "alpha".to_string()));
}

#[test]
fn test_no_viable_constructor() {
    let mut builder = ContainerBuilder::new();
    builder.register_type::<RequiresCount>();
    let container = builder.build().unwrap();

    let error = container.resolve::<Arc<RequiresCount>>().err().unwrap();
    assert!(matches!(error, DependencyError::NoViableConstructor { .. }));
}

#[test]
fn test_named_parameter_satisfies_constructor() {
    let mut builder = ContainerBuilder::new();
    builder
        .register_type::<RequiresCount>()
        .with_parameter("count", 12_i32);
    let container = builder.build().unwrap();

    let service = container.resolve::<Arc<RequiresCount>>().unwrap();
    assert_eq!(service.count, 12);
}

#[test]
fn test_json_parameter_is_converted_to_parameter_type() {
    let mut builder = ContainerBuilder::new();
    builder
        .register_type::<ComplexConstructorService>()
        .with_json_parameter("count", serde_json::json!(3))
        .with_json_parameter("name", serde_json::json!("from-json"));
    let container = builder.build().unwrap();

    let service = container.resolve::<Arc<ComplexConstructorService>>().unwrap();
    assert_eq!(service.chosen, Chosen::CountAndName(3, "from-json".to_string()));
}

#[test]
fn test_selection_is_repeated_for_every_activation() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance(7_i32);
    builder.register_type::<ScheduledService>();
    let container = builder.build().unwrap();

    let first = container.resolve::<Arc<ScheduledService>>().unwrap();
    assert_eq!(first.chosen, Chosen::Default);

    let scope = container
        .begin_lifetime_scope_with(|builder| {
            builder.register_instance("scoped".to_string());
        })
        .unwrap();
    let second = scope.resolve::<Arc<ScheduledService>>().unwrap();
    assert_eq!(second.chosen, Chosen::CountAndName(7, "scoped".to_string()));
}
