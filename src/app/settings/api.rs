//! 设置同步 HTTP API 客户端
//!
//! 远端是一个不透明的键值存储：`{endpoint}/better-chat-gpt/{derivedKey}`

use crate::app::settings::types::{PushSettingsReq, RemoteSettingsResp};
use crate::app::types::{PersistedSettings, SETTINGS_COLLECTION};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 远端设置存储接口
#[async_trait]
pub trait SettingsRemote: Send + Sync {
    /// 读取派生 key 下的设置
    async fn fetch_settings(&self, derived_key: &str) -> Result<RemoteSettingsResp>;

    /// 创建或覆盖派生 key 下的设置
    async fn push_settings(&self, derived_key: &str, settings: &PersistedSettings) -> Result<()>;
}

/// 基于 reqwest 的远端设置 API
pub struct SettingsApi {
    client: reqwest::Client,
    endpoint: String,
}

impl SettingsApi {
    /// 创建新的设置 API 客户端
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// 使用默认 HTTP 客户端创建
    pub fn with_endpoint(endpoint: String) -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .context("创建 HTTP 客户端失败")?;
        Ok(Self::new(client, endpoint))
    }

    /// 构建设置资源 URL
    pub fn settings_url(&self, derived_key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, SETTINGS_COLLECTION, derived_key)
    }
}

#[async_trait]
impl SettingsRemote for SettingsApi {
    async fn fetch_settings(&self, derived_key: &str) -> Result<RemoteSettingsResp> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.settings_url(derived_key);

        info!("[SettingsAPI] 📡 拉取远端设置");
        debug!("[SettingsAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        // 服务器在找不到数据时也返回 JSON（带 message），因此不按状态码判断
        let status = response.status();
        let body_bytes = response.bytes().await.context("读取响应 body 失败")?;
        let body_str = String::from_utf8_lossy(&body_bytes);
        debug!(
            "[SettingsAPI] 拉取响应，HTTP状态: {}, Body: {}",
            status, body_str
        );

        let resp: RemoteSettingsResp = serde_json::from_slice(&body_bytes).map_err(|e| {
            error!(
                "[SettingsAPI] 反序列化失败: {:?}\n原始响应: {}",
                e, body_str
            );
            anyhow::anyhow!("反序列化响应失败: {:?}", e)
        })?;

        Ok(resp)
    }

    async fn push_settings(&self, derived_key: &str, settings: &PersistedSettings) -> Result<()> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.settings_url(derived_key);

        info!(
            "[SettingsAPI] 📤 上传本地设置, cacheId={}",
            settings.state.cache_id
        );
        debug!("[SettingsAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("operationID", &operation_id)
            .json(&PushSettingsReq { settings })
            .send()
            .await
            .context("请求失败")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(
                "[SettingsAPI] 上传设置失败，HTTP状态: {}, 响应: {}",
                status, text
            );
            return Err(anyhow::anyhow!("HTTP 错误 {}: {}", status, text));
        }
        debug!("[SettingsAPI] 上传设置成功，HTTP状态: {}", status);

        Ok(())
    }
}
