//! 宿主环境回调接口
//!
//! 应用对外的副作用（提示、刷新、文档语言、Service Worker 注册）都经由这里，
//! 由调用方决定如何落地。

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

/// 宿主环境接口
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// 阻塞式提示，返回即表示用户已确认
    async fn alert(&self, message: &str);

    /// 整页刷新
    async fn reload(&self);

    /// 设置文档语言属性
    async fn set_document_language(&self, language: &str);

    /// 是否支持 Service Worker
    fn supports_service_worker(&self) -> bool {
        false
    }

    /// 注册 Service Worker，成功时返回注册作用域
    async fn register_service_worker(&self, script_url: &str) -> Result<String> {
        Err(anyhow::anyhow!("不支持 Service Worker: {}", script_url))
    }
}

/// 只输出日志的宿主环境（CLI 使用）
pub struct LoggingHost;

#[async_trait]
impl HostEnvironment for LoggingHost {
    async fn alert(&self, message: &str) {
        warn!("[Host] ⚠️ {}", message);
    }

    async fn reload(&self) {
        info!("[Host] 🔄 重新加载应用状态");
    }

    async fn set_document_language(&self, language: &str) {
        info!("[Host] 🌐 文档语言: {}", language);
    }
}
