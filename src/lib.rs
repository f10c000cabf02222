pub mod app;

// 重新导出常用类型和函数，方便外部使用
pub use app::{
    client::{AppEvent, BootstrapReport, ChatApp},
    config::AppConfig,
    host::{HostEnvironment, LoggingHost},
    settings::{SettingsSyncer, SyncError, SyncOutcome},
    types::{derive_key, PersistedSettings, StoreState},
};
