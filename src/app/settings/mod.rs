//! 设置同步模块
//!
//! 本地设置与远端键值存储之间的后写者胜出同步

pub mod api;
pub mod listener;
pub mod service;
pub mod types;

pub use api::{SettingsApi, SettingsRemote};
pub use listener::{EmptySettingsListener, SettingsListener};
pub use service::SettingsSyncer;
pub use types::{RemoteSettingsResp, SyncError, SyncOutcome};
