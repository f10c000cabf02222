pub mod chat;
pub mod client;
pub mod config;
pub mod db;
pub mod host;
pub mod settings;
pub mod storage;
pub mod store;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

// 重新导出设置同步相关类型
pub use settings::{SettingsSyncer, SyncError, SyncOutcome};
