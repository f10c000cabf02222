//! 应用状态仓库
//!
//! 内存状态与本地持久化存储的唯一修改入口。所有读-改-写都在同一把锁内完成，
//! 上传和同步不会互相覆盖对方的写入。

use crate::app::storage::LocalStorage;
use crate::app::types::{PersistedSettings, StoreState};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// 应用状态仓库
pub struct AppStore {
    storage: Arc<dyn LocalStorage>,
    storage_key: String,
    /// 内存状态与持久化包装中的额外字段（如 version）
    inner: Mutex<PersistedSettings>,
}

impl AppStore {
    /// 从本地存储加载状态，不存在时使用默认状态
    pub async fn hydrate(storage: Arc<dyn LocalStorage>, storage_key: &str) -> Result<Self> {
        let persisted = read_persisted(storage.as_ref(), storage_key)
            .await?
            .unwrap_or_default();
        info!(
            "[Store] 加载本地状态: key={}, cacheId={}",
            storage_key, persisted.state.cache_id
        );
        Ok(Self {
            storage,
            storage_key: storage_key.to_string(),
            inner: Mutex::new(persisted),
        })
    }

    /// 当前内存状态的副本
    pub async fn snapshot(&self) -> StoreState {
        self.inner.lock().await.state.clone()
    }

    /// 修改内存状态并持久化，返回修改后的状态
    pub async fn update<F>(&self, f: F) -> Result<StoreState>
    where
        F: FnOnce(&mut StoreState),
    {
        let mut inner = self.inner.lock().await;
        let mut next = (*inner).clone();
        f(&mut next.state);
        self.write_persisted(&next).await?;
        *inner = next;
        Ok(inner.state.clone())
    }

    /// 开启一次读-改-写事务
    ///
    /// 事务持有仓库锁直到被丢弃，期间其他更新、上传和同步都会等待。
    pub async fn begin(&self) -> Result<StoreTxn<'_>> {
        let guard = self.inner.lock().await;
        let persisted = read_persisted(self.storage.as_ref(), &self.storage_key).await?;
        Ok(StoreTxn {
            store: self,
            guard,
            persisted,
        })
    }

    /// 本地设置所在的存储 key
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// 丢弃内存状态，重新从本地存储加载（等价于整页刷新）
    pub async fn rehydrate(&self) -> Result<StoreState> {
        let mut inner = self.inner.lock().await;
        *inner = read_persisted(self.storage.as_ref(), &self.storage_key)
            .await?
            .unwrap_or_default();
        info!(
            "[Store] 🔄 重新加载本地状态: cacheId={}",
            inner.state.cache_id
        );
        Ok(inner.state.clone())
    }

    /// 删除本地设置并把内存状态重置为默认值
    pub async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.storage.remove_item(&self.storage_key).await?;
        *inner = PersistedSettings::default();
        info!("[Store] 🗑️ 已清除本地设置: key={}", self.storage_key);
        Ok(())
    }

    async fn write_persisted(&self, settings: &PersistedSettings) -> Result<()> {
        let json = serde_json::to_string(settings).context("序列化本地设置失败")?;
        self.storage.set_item(&self.storage_key, &json).await?;
        debug!(
            "[Store] 持久化本地设置: key={}, cacheId={}",
            self.storage_key, settings.state.cache_id
        );
        Ok(())
    }
}

/// 持有仓库锁的事务
pub struct StoreTxn<'a> {
    store: &'a AppStore,
    guard: MutexGuard<'a, PersistedSettings>,
    persisted: Option<PersistedSettings>,
}

impl StoreTxn<'_> {
    /// 事务开始时本地存储中的持久化数据
    pub fn persisted(&self) -> Option<&PersistedSettings> {
        self.persisted.as_ref()
    }

    /// 内存状态
    pub fn state_mut(&mut self) -> &mut StoreState {
        &mut self.guard.state
    }

    /// 写回本地存储（不修改内存状态）
    pub async fn write(&mut self, settings: PersistedSettings) -> Result<()> {
        self.store.write_persisted(&settings).await?;
        self.persisted = Some(settings);
        Ok(())
    }
}

async fn read_persisted(
    storage: &dyn LocalStorage,
    key: &str,
) -> Result<Option<PersistedSettings>> {
    match storage.get_item(key).await? {
        Some(raw) => {
            let parsed = serde_json::from_str::<PersistedSettings>(&raw)
                .with_context(|| format!("解析本地设置失败: {}", key))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
