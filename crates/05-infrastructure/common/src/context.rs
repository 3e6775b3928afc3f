//! 环境上下文
//!
//! 沿逻辑调用链显式传递的不可变键值快照。在执行分叉的位置（启动新线程、
//! 交给异步任务）把当前快照复制给分支；分支内部的修改只对该分支及其后代可见，
//! 永远不会回流到发起方或兄弟分支。

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

/// 环境上下文快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbientContext {
    values: Arc<HashMap<String, String>>,
}

impl AmbientContext {
    /// 创建空上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取值
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// 是否已设置指定键
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// 返回设置了新值的快照，原快照保持不变
    #[must_use]
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut values = (*self.values).clone();
        values.insert(key.into(), value.into());
        Self {
            values: Arc::new(values),
        }
    }

    /// 返回移除了指定键的快照
    #[must_use]
    pub fn without(&self, key: &str) -> Self {
        if !self.contains(key) {
            return self.clone();
        }
        let mut values = (*self.values).clone();
        values.remove(key);
        Self {
            values: Arc::new(values),
        }
    }

    /// 仅在未设置时写入
    #[must_use]
    pub fn with_value_if_absent(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if self.contains(&key) {
            self.clone()
        } else {
            self.with_value(key, value)
        }
    }

    /// 在新线程中执行，线程获得当前快照的副本
    pub fn spawn_thread<F, R>(&self, work: F) -> std::thread::JoinHandle<R>
    where
        F: FnOnce(AmbientContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        let snapshot = self.clone();
        trace!("上下文复制到新线程, 键数量: {}", snapshot.values.len());
        std::thread::spawn(move || work(snapshot))
    }

    /// 交给异步任务执行，任务获得当前快照的副本
    pub fn spawn_task<F, Fut>(&self, work: F) -> tokio::task::JoinHandle<Fut::Output>
    where
        F: FnOnce(AmbientContext) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let snapshot = self.clone();
        trace!("上下文复制到异步任务, 键数量: {}", snapshot.values.len());
        tokio::spawn(work(snapshot))
    }
}
