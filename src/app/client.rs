//! 应用启动流程与事件循环
//!
//! 启动流程是一条有序管线：先等待设置同步完成，再检查本地会话。
//! 同步触发的刷新发生在会话检查之前，检查总是基于刷新后的状态。

use crate::app::chat::initialise_new_chat;
use crate::app::config::AppConfig;
use crate::app::db::create_sqlite_pool_with_migration;
use crate::app::host::HostEnvironment;
use crate::app::settings::{
    EmptySettingsListener, SettingsApi, SettingsListener, SettingsRemote, SettingsSyncer,
    SyncOutcome,
};
use crate::app::storage::{LocalStorage, SqliteStorage};
use crate::app::store::AppStore;
use crate::app::types::StoreState;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// 应用接收的外部事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// 页面加载完成
    Load,
    /// 窗口获得焦点
    Focus,
    /// 界面语言变更
    LanguageChanged(String),
}

/// 一次启动的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub sync: SyncOutcome,
    /// 是否因远端设置较新而重新加载了状态
    pub reloaded: bool,
    /// 是否新建了会话
    pub created_chat: bool,
    /// 是否把越界的会话下标重置为 0
    pub index_reset: bool,
}

/// 聊天应用
pub struct ChatApp {
    config: AppConfig,
    store: Arc<AppStore>,
    syncer: SettingsSyncer,
    host: Arc<dyn HostEnvironment>,
}

impl ChatApp {
    /// 按配置打开本地存储并连接远端
    pub async fn new(config: AppConfig, host: Arc<dyn HostEnvironment>) -> Result<Self> {
        Self::with_listener(config, host, Arc::new(EmptySettingsListener)).await
    }

    /// 按配置创建应用（带自定义同步监听器）
    pub async fn with_listener(
        config: AppConfig,
        host: Arc<dyn HostEnvironment>,
        listener: Arc<dyn SettingsListener>,
    ) -> Result<Self> {
        info!(
            "[App] 创建应用，远端: {}, 本地存储: {}",
            config.database_endpoint, config.storage_db_url
        );
        let pool = create_sqlite_pool_with_migration(&config.storage_db_url).await?;
        let storage: Arc<dyn LocalStorage> = Arc::new(SqliteStorage::new(pool));
        let remote: Arc<dyn SettingsRemote> =
            Arc::new(SettingsApi::with_endpoint(config.database_endpoint.clone())?);
        Self::with_parts(config, storage, remote, host, listener).await
    }

    /// 使用外部提供的存储和远端创建应用
    pub async fn with_parts(
        config: AppConfig,
        storage: Arc<dyn LocalStorage>,
        remote: Arc<dyn SettingsRemote>,
        host: Arc<dyn HostEnvironment>,
        listener: Arc<dyn SettingsListener>,
    ) -> Result<Self> {
        let store = Arc::new(AppStore::hydrate(storage, &config.storage_key).await?);
        let syncer = SettingsSyncer::with_listener(store.clone(), remote, host.clone(), listener);
        Ok(Self {
            config,
            store,
            syncer,
            host,
        })
    }

    /// 当前内存状态
    pub async fn state(&self) -> StoreState {
        self.store.snapshot().await
    }

    /// 设置 API Key 并持久化
    pub async fn set_api_key(&self, api_key: String) -> Result<()> {
        self.store
            .update(|state| state.api_key = Some(api_key))
            .await?;
        info!("[App] 🔑 API Key 已更新");
        Ok(())
    }

    /// 设置持久化后调用：上传到远端
    pub async fn persist_settings(&self) -> Result<i64> {
        self.syncer.upload_settings().await
    }

    /// 清除本地设置
    pub async fn clear_local_settings(&self) -> Result<()> {
        self.store.clear().await
    }

    /// 与远端同步一次
    pub async fn sync(&self) -> SyncOutcome {
        self.syncer.sync_settings().await
    }

    /// 启动：同步设置，确保至少有一个会话且当前下标有效
    pub async fn bootstrap(&self) -> Result<BootstrapReport> {
        info!("[App] 🚀 启动应用");
        self.host.set_document_language(&self.config.language).await;

        let sync = self.syncer.sync_settings().await;
        let reloaded = matches!(sync, SyncOutcome::Replaced { .. });

        let (created_chat, index_reset) = self.ensure_chats().await?;

        Ok(BootstrapReport {
            sync,
            reloaded,
            created_chat,
            index_reset,
        })
    }

    /// 确保至少有一个会话且当前下标落在 [0, len) 内，返回 (是否新建, 是否重置下标)
    async fn ensure_chats(&self) -> Result<(bool, bool)> {
        let mut created_chat = false;
        let mut index_reset = false;
        self.store
            .update(|state| {
                if state.chats.as_ref().map_or(true, |c| c.is_empty()) {
                    initialise_new_chat(state);
                    created_chat = true;
                }
                if !state.chat_index_in_range() {
                    state.current_chat_index = 0;
                    index_reset = true;
                }
            })
            .await?;

        if created_chat {
            info!("[App] 本地没有会话，已新建会话");
        }
        if index_reset {
            warn!("[App] 当前会话下标越界，已重置为 0");
        }
        Ok((created_chat, index_reset))
    }

    /// 处理单个事件
    pub async fn handle_event(&self, event: AppEvent) -> Result<()> {
        debug!("[App] 📥 事件: {:?}", event);
        match event {
            AppEvent::Load => self.register_service_worker().await,
            AppEvent::Focus => {
                info!("[App] 窗口获得焦点，同步设置");
                if let SyncOutcome::Replaced { .. } = self.syncer.sync_settings().await {
                    // 刷新后的状态等同于重新启动，重新做一遍会话检查
                    self.ensure_chats().await?;
                }
            }
            AppEvent::LanguageChanged(language) => {
                self.host.set_document_language(&language).await;
            }
        }
        Ok(())
    }

    /// 启动后顺序处理事件，直到发送端全部关闭
    pub async fn run(&self, events: mpsc::Receiver<AppEvent>) -> Result<BootstrapReport> {
        let report = self.bootstrap().await?;
        self.run_events(events).await?;
        Ok(report)
    }

    /// 顺序处理事件，同一时刻只有一个同步在进行
    ///
    /// 单个事件失败只记录日志，不会结束事件循环。
    pub async fn run_events(&self, mut events: mpsc::Receiver<AppEvent>) -> Result<()> {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(event).await {
                error!("[App] ❌ 处理事件失败: {:#}", e);
            }
        }
        info!("[App] 事件通道已关闭，退出事件循环");
        Ok(())
    }

    async fn register_service_worker(&self) {
        if !self.host.supports_service_worker() {
            debug!("[App] 宿主不支持 Service Worker，跳过注册");
            return;
        }
        match self
            .host
            .register_service_worker(&self.config.service_worker_url)
            .await
        {
            Ok(scope) => info!("[App] ✅ Service worker registered: {}", scope),
            Err(e) => error!("[App] ❌ Error registering service worker: {:#}", e),
        }
    }
}
