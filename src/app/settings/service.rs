//! 设置同步服务层
//!
//! 上传：本地 cacheId 加一后推送到远端。
//! 同步：远端 cacheId 严格大于本地时覆盖本地并刷新，否则什么都不做（没有合并）。

use crate::app::host::HostEnvironment;
use crate::app::settings::api::SettingsRemote;
use crate::app::settings::listener::{EmptySettingsListener, SettingsListener};
use crate::app::settings::types::{SyncError, SyncOutcome};
use crate::app::store::AppStore;
use crate::app::types::derive_key;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

/// 远端覆盖本地前给用户的提示
pub const SYNC_ALERT_MESSAGE: &str = "Settings will be synced with the server. Page will reload...";

/// 设置同步器
pub struct SettingsSyncer {
    store: Arc<AppStore>,
    remote: Arc<dyn SettingsRemote>,
    host: Arc<dyn HostEnvironment>,
    listener: Arc<dyn SettingsListener>,
}

impl SettingsSyncer {
    /// 创建新的设置同步器（使用默认空监听器）
    pub fn new(
        store: Arc<AppStore>,
        remote: Arc<dyn SettingsRemote>,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        Self::with_listener(store, remote, host, Arc::new(EmptySettingsListener))
    }

    /// 创建新的设置同步器（带自定义监听器）
    pub fn with_listener(
        store: Arc<AppStore>,
        remote: Arc<dyn SettingsRemote>,
        host: Arc<dyn HostEnvironment>,
        listener: Arc<dyn SettingsListener>,
    ) -> Self {
        Self {
            store,
            remote,
            host,
            listener,
        }
    }

    /// 上传本地设置，返回新的 cacheId
    ///
    /// cacheId 在发起请求前已经提交到本地，请求失败不会回滚。
    pub async fn upload_settings(&self) -> Result<i64> {
        let api_key = self
            .store
            .snapshot()
            .await
            .credential()
            .map(str::to_string)
            .ok_or(SyncError::MissingCredential)?;

        let settings = {
            let mut txn = self.store.begin().await?;
            let mut settings = txn
                .persisted()
                .cloned()
                .ok_or_else(|| SyncError::MissingLocalSettings(self.store.storage_key().to_string()))?;
            settings.state.cache_id += 1;
            txn.state_mut().cache_id = settings.state.cache_id;
            txn.write(settings.clone()).await?;
            settings
        };
        let cache_id = settings.state.cache_id;
        info!("[SettingsSync] 📤 本地 cacheId 递增为 {}", cache_id);

        if let Err(e) = self
            .remote
            .push_settings(&derive_key(&api_key), &settings)
            .await
        {
            error!(
                "[SettingsSync] ❌ 上传设置失败，本地 cacheId 保持为 {}: {:#}",
                cache_id, e
            );
            return Err(e);
        }

        info!("[SettingsSync] ✅ 设置上传完成, cacheId={}", cache_id);
        self.listener.on_settings_uploaded(cache_id).await;
        Ok(cache_id)
    }

    /// 与远端同步设置
    ///
    /// 所有错误都只记录日志并返回 `SyncOutcome::Failed`，本地状态保持不变。
    pub async fn sync_settings(&self) -> SyncOutcome {
        let api_key = match self.store.snapshot().await.credential() {
            Some(key) => key.to_string(),
            None => {
                debug!("[SettingsSync] 未设置 API Key，跳过同步");
                return SyncOutcome::NoCredential;
            }
        };

        info!("[SettingsSync] 🔄 开始同步远端设置...");
        self.listener.on_sync_start().await;

        match self.try_sync(&api_key).await {
            Ok(outcome) => {
                let replaced = matches!(outcome, SyncOutcome::Replaced { .. });
                self.listener.on_sync_finish(replaced).await;
                outcome
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                error!("[SettingsSync] ❌ 同步远端设置失败: {}", reason);
                self.listener.on_sync_failed(reason.clone()).await;
                SyncOutcome::Failed(reason)
            }
        }
    }

    async fn try_sync(&self, api_key: &str) -> Result<SyncOutcome> {
        let resp = self.remote.fetch_settings(&derive_key(api_key)).await?;
        let mut remote = match resp.settings {
            Some(settings) => settings,
            None => {
                return Err(SyncError::RemoteSettingsMissing(resp.message.unwrap_or_default()).into())
            }
        };

        // 远端保存的 key 不完整，换回本地真实的 key
        remote.state.api_key = Some(api_key.to_string());
        let remote_id = remote.state.cache_id;

        let mut txn = self.store.begin().await?;
        let local_id = txn
            .persisted()
            .map(|p| p.state.cache_id)
            .ok_or_else(|| SyncError::MissingLocalSettings(self.store.storage_key().to_string()))?;

        if local_id >= remote_id {
            info!(
                "[SettingsSync] ✓ 本地设置已是最新: 本地 cacheId={}, 远端 cacheId={}",
                local_id, remote_id
            );
            return Ok(SyncOutcome::UpToDate {
                local: local_id,
                remote: remote_id,
            });
        }

        info!(
            "[SettingsSync] 📥 远端设置较新，覆盖本地: cacheId {} -> {}",
            local_id, remote_id
        );
        self.host.alert(SYNC_ALERT_MESSAGE).await;
        txn.write(remote).await?;
        drop(txn);
        self.host.reload().await;
        // 刷新后内存状态只能来自本地存储
        self.store.rehydrate().await?;

        Ok(SyncOutcome::Replaced {
            previous: local_id,
            cache_id: remote_id,
        })
    }
}
