//! 设置同步 DTO 与结果类型

use crate::app::types::PersistedSettings;
use serde::{Deserialize, Serialize};

/// 远端读取响应：`{ settings?: { state }, message? }`
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettingsResp {
    #[serde(default)]
    pub settings: Option<PersistedSettings>,
    #[serde(default)]
    pub message: Option<String>,
}

/// 远端写入请求体：`{ settings: {...} }`
#[derive(Debug, Serialize)]
pub struct PushSettingsReq<'a> {
    pub settings: &'a PersistedSettings,
}

/// 设置同步过程中的可分类错误
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("未设置 API Key")]
    MissingCredential,
    #[error("本地设置不存在: {0}")]
    MissingLocalSettings(String),
    #[error("远端没有设置数据: {0}")]
    RemoteSettingsMissing(String),
}

/// 一次同步的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// 没有 API Key，未发起任何请求
    NoCredential,
    /// 本地版本不低于远端，不做任何修改（相等时即使内容不同也忽略）
    UpToDate { local: i64, remote: i64 },
    /// 远端较新，本地已被覆盖并触发刷新
    Replaced { previous: i64, cache_id: i64 },
    /// 同步失败，只记录日志，本地状态不变
    Failed(String),
}
