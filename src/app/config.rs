//! 应用配置

use crate::app::types::DEFAULT_STORAGE_KEY;

/// 远端设置存储服务地址
pub const DATABASE_ENDPOINT: &str = "https://scrap.pierremouchan.com";

/// 应用配置
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// 远端键值存储的基础地址
    pub database_endpoint: String,
    /// 本地存储使用的 SQLite 数据库 URL
    ///
    /// 例如：`sqlite://better-chat.db?mode=rwc`
    pub storage_db_url: String,
    /// 本地设置所在的存储 key
    pub storage_key: String,
    /// Service Worker 脚本地址
    pub service_worker_url: String,
    /// 启动时的界面语言
    pub language: String,
}

impl AppConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self {
            database_endpoint: DATABASE_ENDPOINT.to_string(),
            storage_db_url: "sqlite://better-chat.db?mode=rwc".to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            service_worker_url: "/service-worker.js".to_string(),
            language: "en".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}
