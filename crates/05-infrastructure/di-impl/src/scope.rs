//! 生命周期作用域树
//!
//! 子作用域持有父作用域的强引用，仅用于查询注册和共享单例；父作用域只持有子作用域的弱引用，
//! 用于在释放时先释放仍然存活的子作用域。

use crate::builder::ContainerBuilder;
use crate::catalog::{select_default, Catalog, Registration};
use crate::resolver;
use di_abstractions::{Disposable, Instance, Resolvable, ResolveContext};
use infrastructure_common::{
    DependencyError, DependencyResult, LifecycleError, LifecycleResult, ScopeInfo, ServiceKey,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, info, trace, warn};

/// 作用域缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CacheKey {
    /// 注册激活出的组件实例，多个服务共享
    Component(u64),
    /// 经过装饰的服务值
    Service(u64, ServiceKey),
}

/// 缓存槽，记录正在执行激活的线程
#[derive(Default)]
struct CacheSlot {
    value: OnceCell<Instance>,
    activating: Mutex<Option<ThreadId>>,
}

/// 激活期间占用缓存槽，结束或展开时释放
struct ActivationGuard<'a> {
    activating: &'a Mutex<Option<ThreadId>>,
}

impl<'a> ActivationGuard<'a> {
    fn enter(activating: &'a Mutex<Option<ThreadId>>, thread: ThreadId) -> Self {
        *activating.lock() = Some(thread);
        Self { activating }
    }
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        *self.activating.lock() = None;
    }
}

#[derive(Default)]
struct ScopeState {
    disposed: bool,
    cache: HashMap<CacheKey, Arc<CacheSlot>>,
    disposables: Vec<Arc<dyn Disposable>>,
    children: Vec<Weak<ScopeNode>>,
}

/// 作用域树节点
pub(crate) struct ScopeNode {
    info: ScopeInfo,
    parent: Option<Arc<ScopeNode>>,
    overlay: Catalog,
    state: Mutex<ScopeState>,
}

impl ScopeNode {
    fn new(info: ScopeInfo, parent: Option<Arc<ScopeNode>>, overlay: Catalog) -> Self {
        Self {
            info,
            parent,
            overlay,
            state: Mutex::new(ScopeState::default()),
        }
    }

    pub(crate) fn info(&self) -> &ScopeInfo {
        &self.info
    }

    pub(crate) fn disposed_error(&self) -> DependencyError {
        DependencyError::ScopeDisposed {
            scope_id: self.info.to_string(),
        }
    }

    pub(crate) fn ensure_active(&self) -> DependencyResult<()> {
        if self.state.lock().disposed {
            return Err(self.disposed_error());
        }
        Ok(())
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// 创建子作用域
    pub(crate) fn begin_child(
        self: &Arc<Self>,
        tag: &str,
        overlay: Catalog,
    ) -> DependencyResult<Arc<ScopeNode>> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(self.disposed_error());
        }
        let child = Arc::new(ScopeNode::new(
            self.info.child(tag),
            Some(Arc::clone(self)),
            overlay,
        ));
        state.children.retain(|child| child.strong_count() > 0);
        state.children.push(Arc::downgrade(&child));
        debug!(
            "创建生命周期作用域: {}, 深度: {}, 覆盖注册数量: {}",
            child.info,
            child.info.depth,
            child.overlay.len()
        );
        Ok(child)
    }

    /// 从根到自身的作用域链
    fn chain(self: &Arc<Self>) -> Vec<Arc<ScopeNode>> {
        let mut chain = vec![Arc::clone(self)];
        let mut current = self.parent.clone();
        while let Some(node) = current {
            current = node.parent.clone();
            chain.push(node);
        }
        chain.reverse();
        chain
    }

    /// 服务的默认注册及其所属作用域
    pub(crate) fn lookup(
        self: &Arc<Self>,
        key: &ServiceKey,
    ) -> Option<(Arc<ScopeNode>, Arc<Registration>)> {
        let chain = self.chain();
        select_default(
            chain.iter().flat_map(|node| {
                node.overlay
                    .registrations()
                    .iter()
                    .map(move |registration| (Arc::clone(node), registration))
            }),
            key,
        )
    }

    /// 服务的全部注册及其所属作用域，按从根开始的注册顺序
    pub(crate) fn lookup_all(
        self: &Arc<Self>,
        key: &ServiceKey,
    ) -> Vec<(Arc<ScopeNode>, Arc<Registration>)> {
        self.chain()
            .into_iter()
            .flat_map(|node| {
                node.overlay
                    .lookup_all(key)
                    .into_iter()
                    .map(move |registration| (Arc::clone(&node), registration))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// 服务的装饰器，按从根开始的注册顺序
    pub(crate) fn decorators_for(self: &Arc<Self>, key: &ServiceKey) -> Vec<Arc<Registration>> {
        self.chain()
            .iter()
            .flat_map(|node| node.overlay.decorators_for(key))
            .collect()
    }

    /// 服务是否在本作用域或任一祖先作用域中注册
    pub(crate) fn contains(&self, key: &ServiceKey) -> bool {
        self.overlay.contains(key)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.contains(key))
    }

    /// 取缓存值，不存在时激活并缓存
    ///
    /// 激活在锁外进行；同一个键并发激活时只有一个调用执行激活，其余等待结果。
    /// 激活失败不会留下缓存值。激活过程中同一线程再次请求同一个键
    /// (例如通过 `Lazy` 或 `Factory` 解析自身) 返回循环依赖错误。
    pub(crate) fn cached<F>(
        &self,
        key: CacheKey,
        service: &ServiceKey,
        activate: F,
    ) -> DependencyResult<Instance>
    where
        F: FnOnce() -> DependencyResult<Instance>,
    {
        let slot = {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(self.disposed_error());
            }
            Arc::clone(state.cache.entry(key).or_default())
        };
        if let Some(value) = slot.value.get() {
            return Ok(value.clone());
        }

        let current = thread::current().id();
        if *slot.activating.lock() == Some(current) {
            return Err(DependencyError::CircularDependency {
                dependency_chain: format!("{service} -> {service}"),
            });
        }
        slot.value
            .get_or_try_init(|| {
                let _guard = ActivationGuard::enter(&slot.activating, current);
                activate()
            })
            .cloned()
    }

    /// 登记由本作用域负责释放的实例
    pub(crate) fn track(&self, disposable: Arc<dyn Disposable>) {
        let mut state = self.state.lock();
        if !state.disposed {
            state.disposables.push(disposable);
            return;
        }
        drop(state);
        warn!("作用域已释放, 立即释放新创建的实例: {}", self.info);
        if let Err(error) = disposable.dispose() {
            warn!("实例释放失败: {}", error);
        }
    }

    /// 释放作用域
    ///
    /// 先释放仍然存活的子作用域，再按创建顺序的逆序释放本作用域登记的实例。
    /// 单个实例释放失败不影响其余实例，全部尝试后统一报告。重复释放不做任何事。
    pub(crate) fn dispose(&self) -> LifecycleResult<()> {
        let (children, disposables, cache) = {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
            (
                std::mem::take(&mut state.children),
                std::mem::take(&mut state.disposables),
                std::mem::take(&mut state.cache),
            )
        };

        let mut failures = Vec::new();
        for child in children.iter().rev().filter_map(Weak::upgrade) {
            if let Err(error) = child.dispose() {
                failures.push(error.to_string());
            }
        }
        let count = disposables.len();
        for disposable in disposables.into_iter().rev() {
            if let Err(error) = disposable.dispose() {
                failures.push(error.to_string());
            }
        }
        drop(cache);

        if failures.is_empty() {
            info!("生命周期作用域已释放: {}, 释放实例数量: {}", self.info, count);
            Ok(())
        } else {
            warn!(
                "生命周期作用域释放时出现错误: {}, 失败数量: {}",
                self.info,
                failures.len()
            );
            Err(LifecycleError::DisposalFailed {
                scope_id: self.info.to_string(),
                failures,
            })
        }
    }
}

impl Drop for ScopeNode {
    fn drop(&mut self) {
        if self.state.get_mut().disposed {
            return;
        }
        trace!("最后一个句柄已释放, 自动释放作用域: {}", self.info);
        if let Err(error) = self.dispose() {
            warn!("自动释放作用域失败: {}", error);
        }
    }
}

impl fmt::Debug for ScopeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeNode")
            .field("info", &self.info)
            .field("registrations", &self.overlay.len())
            .finish()
    }
}

/// 生命周期作用域
///
/// 可克隆的句柄，所有句柄都被丢弃且作用域未显式释放时自动释放。
#[derive(Debug, Clone)]
pub struct LifetimeScope {
    pub(crate) node: Arc<ScopeNode>,
}

/// 构建完成的容器就是根生命周期作用域
pub type Container = LifetimeScope;

impl LifetimeScope {
    pub(crate) fn root(catalog: Catalog) -> Self {
        Self {
            node: Arc::new(ScopeNode::new(ScopeInfo::root(), None, catalog)),
        }
    }

    pub(crate) fn from_node(node: Arc<ScopeNode>) -> Self {
        Self { node }
    }

    /// 解析依赖
    ///
    /// `P` 可以是 `Arc<S>`、`Lazy<S>`、`Vec<Arc<S>>` 或 `Factory<(A, ..), S>`。
    pub fn resolve<P: Resolvable>(&self) -> DependencyResult<P> {
        let mut context = ResolveContext::new();
        let resolved = resolver::resolve_dependency(&self.node, &P::dependency(), &mut context)?;
        P::from_resolved(resolved)
    }

    /// 解析命名服务
    pub fn resolve_named<S: ?Sized + Send + Sync + 'static>(
        &self,
        name: impl Into<String>,
    ) -> DependencyResult<Arc<S>> {
        let key = ServiceKey::named::<S>(name);
        let mut context = ResolveContext::new();
        let instance = resolver::resolve_service(&self.node, &key, &mut context, &[])?;
        di_abstractions::downcast_instance::<S>(&instance)
    }

    /// 解析服务的全部实现
    pub fn resolve_all<S: ?Sized + Send + Sync + 'static>(&self) -> DependencyResult<Vec<Arc<S>>> {
        self.resolve::<Vec<Arc<S>>>()
    }

    /// 服务是否已注册
    pub fn is_registered<S: ?Sized + 'static>(&self) -> bool {
        self.node.contains(&ServiceKey::of::<S>())
    }

    /// 命名服务是否已注册
    pub fn is_registered_named<S: ?Sized + 'static>(&self, name: impl Into<String>) -> bool {
        self.node.contains(&ServiceKey::named::<S>(name))
    }

    /// 创建子作用域
    pub fn begin_lifetime_scope(&self) -> DependencyResult<LifetimeScope> {
        self.node
            .begin_child("scope", Catalog::new())
            .map(Self::from_node)
    }

    /// 创建带附加注册的子作用域
    ///
    /// 附加注册只在子作用域及其后代中可见，重新声明的服务遮蔽祖先作用域中的默认注册。
    pub fn begin_lifetime_scope_with<F>(&self, configure: F) -> DependencyResult<LifetimeScope>
    where
        F: FnOnce(&mut ContainerBuilder),
    {
        self.node.ensure_active()?;
        let mut builder = ContainerBuilder::new();
        configure(&mut builder);
        let overlay = builder.into_catalog()?;
        self.node.begin_child("scope", overlay).map(Self::from_node)
    }

    /// 创建带标签的子作用域
    pub(crate) fn begin_tagged(&self, tag: &str, overlay: Catalog) -> DependencyResult<LifetimeScope> {
        self.node.begin_child(tag, overlay).map(Self::from_node)
    }

    /// 释放作用域及其全部子作用域
    pub fn dispose(&self) -> LifecycleResult<()> {
        self.node.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.node.is_disposed()
    }

    /// 作用域标识
    pub fn info(&self) -> &ScopeInfo {
        self.node.info()
    }
}
