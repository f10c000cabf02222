//! 设置同步监听器回调接口

use async_trait::async_trait;

/// 设置同步监听器
#[async_trait]
pub trait SettingsListener: Send + Sync {
    /// 开始与远端同步
    async fn on_sync_start(&self);

    /// 同步结束，`replaced` 表示本地设置已被远端覆盖
    async fn on_sync_finish(&self, replaced: bool);

    /// 同步失败
    async fn on_sync_failed(&self, reason: String);

    /// 本地设置已上传，参数为新的 cacheId
    async fn on_settings_uploaded(&self, cache_id: i64);
}

/// 空实现（默认监听器）
pub struct EmptySettingsListener;

#[async_trait]
impl SettingsListener for EmptySettingsListener {
    async fn on_sync_start(&self) {}
    async fn on_sync_finish(&self, _replaced: bool) {}
    async fn on_sync_failed(&self, _reason: String) {}
    async fn on_settings_uploaded(&self, _cache_id: i64) {}
}
