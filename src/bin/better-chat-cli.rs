//! Better-Chat 设置同步 CLI
//!
//! 管理本地设置、上传/拉取远端设置，以及模拟应用启动和窗口焦点事件。

use anyhow::{Context, Result};
use better_chat_sync::app::settings::SettingsListener;
use better_chat_sync::{AppConfig, AppEvent, ChatApp, LoggingHost};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

/// Better-Chat 设置同步 CLI
#[derive(Parser, Debug)]
#[command(name = "better-chat-cli")]
#[command(about = "Better-Chat 设置同步 CLI - 本地设置与远端存储的同步工具", long_about = None)]
struct Args {
    /// 远端存储地址（默认取应用配置）
    #[arg(long)]
    endpoint: Option<String>,

    /// 本地 SQLite 数据库 URL（默认取应用配置）
    #[arg(long)]
    db: Option<String>,

    /// 界面语言（默认取应用配置）
    #[arg(long)]
    language: Option<String>,

    /// 日志过滤规则，设置了 RUST_LOG 时以环境变量为准
    #[arg(long, default_value = "info,better_chat_sync=debug")]
    log_level: String,

    /// 额外写入的日志文件，不指定则只输出到控制台
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// 命令行参数覆盖默认应用配置
    fn app_config(&self) -> AppConfig {
        let mut config = AppConfig::new();
        if let Some(endpoint) = &self.endpoint {
            config.database_endpoint = endpoint.clone();
        }
        if let Some(db) = &self.db {
            config.storage_db_url = db.clone();
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 设置 API Key
    SetKey { api_key: String },
    /// 打印本地设置
    Show,
    /// 上传本地设置
    Upload,
    /// 与远端同步一次
    Sync,
    /// 执行一次启动流程
    Bootstrap,
    /// 清除本地设置
    Reset,
    /// 启动后按固定间隔模拟窗口焦点事件
    Watch {
        /// 间隔（秒）
        #[arg(short, long, default_value = "30")]
        interval: u64,
    },
}

/// 按命令行参数初始化日志：控制台总是输出，文件可选
fn init_logger(args: &Args) -> Result<()> {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("无法打开日志文件 {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_target(false)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    if let Some(path) = &args.log_file {
        info!("[CLI] 📝 日志同时写入 {}", path.display());
    }
    Ok(())
}

/// 输出同步回调
struct CliSettingsListener;

#[async_trait::async_trait]
impl SettingsListener for CliSettingsListener {
    async fn on_sync_start(&self) {
        info!("[CLI/Sync] 🔄 同步开始");
    }

    async fn on_sync_finish(&self, replaced: bool) {
        if replaced {
            info!("[CLI/Sync] ✅ 同步完成，本地设置已被远端覆盖");
        } else {
            info!("[CLI/Sync] ✅ 同步完成，本地设置已是最新");
        }
    }

    async fn on_sync_failed(&self, reason: String) {
        error!("[CLI/Sync] ❌ 同步失败: {}", reason);
    }

    async fn on_settings_uploaded(&self, cache_id: i64) {
        info!("[CLI/Sync] 📤 设置已上传: cacheId={}", cache_id);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args)?;

    let app = ChatApp::with_listener(
        args.app_config(),
        Arc::new(LoggingHost),
        Arc::new(CliSettingsListener),
    )
    .await?;

    match args.command {
        Command::SetKey { api_key } => {
            app.set_api_key(api_key).await?;
        }
        Command::Show => {
            let state = app.state().await;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::Upload => {
            let cache_id = app.persist_settings().await?;
            info!("[CLI] ✅ 上传完成: cacheId={}", cache_id);
        }
        Command::Sync => {
            let outcome = app.sync().await;
            info!("[CLI] 同步结果: {:?}", outcome);
        }
        Command::Bootstrap => {
            let report = app.bootstrap().await?;
            info!("[CLI] 启动结果: {:?}", report);
        }
        Command::Reset => {
            app.clear_local_settings().await?;
            info!("[CLI] 🗑️ 本地设置已清除");
        }
        Command::Watch { interval: secs } => {
            let (tx, rx) = mpsc::channel(16);
            tx.send(AppEvent::Load).await?;

            tokio::spawn(async move {
                let mut ticker = interval(Duration::from_secs(secs.max(1)));
                // 第一次 tick 立即返回，启动时已经同步过
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if tx.send(AppEvent::Focus).await.is_err() {
                        warn!("[CLI] 事件通道已关闭，停止发送焦点事件");
                        break;
                    }
                }
            });

            info!("[CLI] ⏰ 每 {} 秒同步一次，按 Ctrl+C 退出", secs.max(1));
            tokio::select! {
                res = app.run(rx) => {
                    let report = res?;
                    info!("[CLI] 启动结果: {:?}", report);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("[CLI] 👋 程序退出");
                }
            }
        }
    }

    Ok(())
}
