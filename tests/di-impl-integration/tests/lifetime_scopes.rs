//! 生命周期作用域集成测试

use di_abstractions::Disposable;
use di_impl::{Container, ContainerBuilder};
use infrastructure_common::{BoxError, DependencyError, LifecycleError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 记录释放次数和顺序的组件
struct Connection {
    name: &'static str,
    disposed: AtomicUsize,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Connection {
    fn disposed_count(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Disposable for Connection {
    fn dispose(&self) -> Result<(), BoxError> {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(self.name);
        Ok(())
    }
}

struct FailingResource;

impl Disposable for FailingResource {
    fn dispose(&self) -> Result<(), BoxError> {
        Err("连接已断开".into())
    }
}

struct Session;
struct Settings;

fn connection(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Connection {
    Connection {
        name,
        disposed: AtomicUsize::new(0),
        log: Arc::clone(log),
    }
}

fn container(log: &Arc<Mutex<Vec<&'static str>>>) -> Container {
    let scoped_log = Arc::clone(log);
    let singleton_log = Arc::clone(log);

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| Ok(connection("scoped", &scoped_log)))
        .instance_per_lifetime_scope()
        .disposable();
    builder
        .register(move |_| Ok(connection("singleton", &singleton_log)))
        .named::<Connection>("shared", |c| c)
        .single_instance()
        .disposable();
    builder
        .register(|_| Ok(Session))
        .instance_per_dependency();
    builder.register(|_| Ok(Settings)).single_instance();
    builder.build().unwrap()
}

fn new_log() -> Arc<Mutex<Vec<&'static str>>> {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn test_per_lifetime_scope_shared_within_scope() {
    let container = container(&new_log());
    let scope = container.begin_lifetime_scope().unwrap();

    let first = scope.resolve::<Arc<Connection>>().unwrap();
    let second = scope.resolve::<Arc<Connection>>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_per_lifetime_scope_differs_between_siblings() {
    let container = container(&new_log());
    let left = container.begin_lifetime_scope().unwrap();
    let right = container.begin_lifetime_scope().unwrap();

    let a = left.resolve::<Arc<Connection>>().unwrap();
    let b = right.resolve::<Arc<Connection>>().unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_per_lifetime_scope_differs_between_parent_and_child() {
    let container = container(&new_log());
    let parent = container.begin_lifetime_scope().unwrap();
    let child = parent.begin_lifetime_scope().unwrap();

    let a = parent.resolve::<Arc<Connection>>().unwrap();
    let b = child.resolve::<Arc<Connection>>().unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_single_instance_shared_across_scopes() {
    let container = container(&new_log());
    let left = container.begin_lifetime_scope().unwrap();
    let nested = left.begin_lifetime_scope().unwrap();

    let root = container.resolve::<Arc<Settings>>().unwrap();
    let a = left.resolve::<Arc<Settings>>().unwrap();
    let b = nested.resolve::<Arc<Settings>>().unwrap();

    assert!(Arc::ptr_eq(&root, &a));
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_per_dependency_always_new() {
    let container = container(&new_log());
    let scope = container.begin_lifetime_scope().unwrap();

    let a = scope.resolve::<Arc<Session>>().unwrap();
    let b = scope.resolve::<Arc<Session>>().unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_scope_disposes_its_instances_exactly_once() {
    let container = container(&new_log());
    let scope = container.begin_lifetime_scope().unwrap();
    let connection = scope.resolve::<Arc<Connection>>().unwrap();

    scope.dispose().unwrap();
    scope.dispose().unwrap();

    assert!(scope.is_disposed());
    assert_eq!(connection.disposed_count(), 1);
}

#[test]
fn test_child_scope_never_disposes_single_instance() {
    let log = new_log();
    let container = container(&log);
    let scope = container.begin_lifetime_scope().unwrap();

    let shared = scope.resolve_named::<Connection>("shared").unwrap();
    scope.dispose().unwrap();
    assert_eq!(shared.disposed_count(), 0);

    container.dispose().unwrap();
    assert_eq!(shared.disposed_count(), 1);
}

#[test]
fn test_children_disposed_before_parent_instances() {
    let log = new_log();
    let container = container(&log);
    let scope = container.begin_lifetime_scope().unwrap();

    let _shared = container.resolve_named::<Connection>("shared").unwrap();
    let _scoped = scope.resolve::<Arc<Connection>>().unwrap();

    container.dispose().unwrap();

    assert!(scope.is_disposed());
    assert_eq!(*log.lock().unwrap(), vec!["scoped", "singleton"]);
}

#[test]
fn test_instances_disposed_in_reverse_creation_order() {
    let log = new_log();
    let first_log = Arc::clone(&log);
    let second_log = Arc::clone(&log);

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| Ok(connection("first", &first_log)))
        .named::<Connection>("first", |c| c)
        .instance_per_lifetime_scope()
        .disposable();
    builder
        .register(move |_| Ok(connection("second", &second_log)))
        .named::<Connection>("second", |c| c)
        .instance_per_lifetime_scope()
        .disposable();
    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope().unwrap();

    scope.resolve_named::<Connection>("first").unwrap();
    scope.resolve_named::<Connection>("second").unwrap();
    scope.dispose().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
}

#[test]
fn test_disposal_failures_are_collected() {
    let log = new_log();
    let scoped_log = Arc::clone(&log);

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| Ok(connection("scoped", &scoped_log)))
        .instance_per_lifetime_scope()
        .disposable();
    builder
        .register(|_| Ok(FailingResource))
        .instance_per_lifetime_scope()
        .disposable();
    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope().unwrap();

    let connection = scope.resolve::<Arc<Connection>>().unwrap();
    scope.resolve::<Arc<FailingResource>>().unwrap();

    let error = scope.dispose().err().unwrap();
    match error {
        LifecycleError::DisposalFailed { failures, .. } => {
            assert_eq!(failures, vec!["连接已断开".to_string()]);
        }
        other => panic!("意外的错误: {other}"),
    }
    assert_eq!(connection.disposed_count(), 1);
    assert!(scope.is_disposed());
}

#[test]
fn test_disposed_scope_rejects_resolution() {
    let container = container(&new_log());
    let scope = container.begin_lifetime_scope().unwrap();
    scope.dispose().unwrap();

    let error = scope.resolve::<Arc<Settings>>().err().unwrap();
    assert!(matches!(error, DependencyError::ScopeDisposed { .. }));

    let error = scope.begin_lifetime_scope().err().unwrap();
    assert!(matches!(error, DependencyError::ScopeDisposed { .. }));
}

#[test]
fn test_dropping_scope_disposes_it() {
    let container = container(&new_log());
    let connection = {
        let scope = container.begin_lifetime_scope().unwrap();
        let connection = scope.resolve::<Arc<Connection>>().unwrap();
        assert_eq!(connection.disposed_count(), 0);
        connection
    };

    assert_eq!(connection.disposed_count(), 1);
}

#[test]
fn test_unopted_components_are_not_tracked() {
    struct Untracked {
        disposed: AtomicUsize,
    }

    impl Disposable for Untracked {
        fn dispose(&self) -> Result<(), BoxError> {
            self.disposed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| {
            Ok(Untracked {
                disposed: AtomicUsize::new(0),
            })
        })
        .instance_per_lifetime_scope();
    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope().unwrap();

    let untracked = scope.resolve::<Arc<Untracked>>().unwrap();
    scope.dispose().unwrap();

    assert_eq!(untracked.disposed.load(Ordering::SeqCst), 0);
}

#[test]
fn test_scope_overlay_shadows_parent_registration() {
    let container = container(&new_log());
    let scope = container
        .begin_lifetime_scope_with(|builder| {
            builder.register_instance(42_u32);
            builder.register(|_| Ok(Settings)).single_instance();
        })
        .unwrap();

    assert_eq!(*scope.resolve::<Arc<u32>>().unwrap(), 42);
    assert!(!container.is_registered::<u32>());

    let root_settings = container.resolve::<Arc<Settings>>().unwrap();
    let scoped_settings = scope.resolve::<Arc<Settings>>().unwrap();
    assert!(!Arc::ptr_eq(&root_settings, &scoped_settings));
    assert!(Arc::ptr_eq(
        &scoped_settings,
        &scope.resolve::<Arc<Settings>>().unwrap()
    ));
}

#[test]
fn test_scope_info_describes_tree() {
    let container = container(&new_log());
    let child = container.begin_lifetime_scope().unwrap();
    let grandchild = child.begin_lifetime_scope().unwrap();

    assert!(container.info().is_root());
    assert_eq!(child.info().depth, 1);
    assert_eq!(grandchild.info().depth, 2);
    assert_ne!(child.info().id, grandchild.info().id);
}

#[test]
fn test_single_instance_activated_once_under_contention() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(Settings)
        })
        .single_instance();
    let container = builder.build().unwrap();

    let resolved: Vec<Arc<Settings>> = std::thread::scope(|threads| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scope = container.begin_lifetime_scope().unwrap();
                threads.spawn(move || scope.resolve::<Arc<Settings>>().unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(resolved.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn test_per_lifetime_scope_activated_once_under_contention() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(Session)
        })
        .instance_per_lifetime_scope();
    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope().unwrap();
    let start = std::sync::Barrier::new(8);

    let resolved: Vec<Arc<Session>> = std::thread::scope(|threads| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                threads.spawn(|| {
                    start.wait();
                    scope.resolve::<Arc<Session>>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(resolved.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));

    // 其他作用域有自己的实例
    let other = container.begin_lifetime_scope().unwrap();
    let other_session = other.resolve::<Arc<Session>>().unwrap();
    assert!(!Arc::ptr_eq(&resolved[0], &other_session));
    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[test]
fn test_disposable_instance_released_once_by_owner() {
    let log = new_log();
    let mut builder = ContainerBuilder::new();
    builder
        .register_instance(connection("instance", &log))
        .disposable();
    let container = builder.build().unwrap();

    let child = container.begin_lifetime_scope().unwrap();
    let from_child = child.resolve::<Arc<Connection>>().unwrap();
    let from_root = container.resolve::<Arc<Connection>>().unwrap();
    assert!(Arc::ptr_eq(&from_child, &from_root));

    child.dispose().unwrap();
    assert_eq!(from_root.disposed_count(), 0);

    container.dispose().unwrap();
    container.dispose().unwrap();
    assert_eq!(from_root.disposed_count(), 1);
    assert_eq!(*log.lock().unwrap(), vec!["instance"]);
}
