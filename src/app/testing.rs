//! 单测共用的假实现

use crate::app::host::HostEnvironment;
use crate::app::settings::api::SettingsRemote;
use crate::app::settings::listener::SettingsListener;
use crate::app::settings::types::RemoteSettingsResp;
use crate::app::storage::{LocalStorage, MemoryStorage};
use crate::app::types::PersistedSettings;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

static INIT_LOGGER: Once = Once::new();

pub fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        let filter_layer =
            EnvFilter::new("info,better_chat_sync=debug,sqlx=warn,hyper_util::client=info,reqwest=info");

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_test_writer();

        let _ = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .try_init();
    });
}

/// 返回固定响应体的远端
pub struct FakeRemote {
    body: Mutex<String>,
    fail_fetch: AtomicBool,
    fail_push: AtomicBool,
    fetched: Mutex<Vec<String>>,
    pushed: Mutex<Vec<(String, PersistedSettings)>>,
}

impl FakeRemote {
    pub fn with_body(body: &str) -> Self {
        Self {
            body: Mutex::new(body.to_string()),
            fail_fetch: AtomicBool::new(false),
            fail_push: AtomicBool::new(false),
            fetched: Mutex::new(Vec::new()),
            pushed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_body(&self, body: &str) {
        *self.body.lock().unwrap() = body.to_string();
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    pub fn fetched_keys(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn pushed(&self) -> Vec<(String, PersistedSettings)> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettingsRemote for FakeRemote {
    async fn fetch_settings(&self, derived_key: &str) -> Result<RemoteSettingsResp> {
        self.fetched.lock().unwrap().push(derived_key.to_string());
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("请求失败: connection refused"));
        }
        let body = self.body.lock().unwrap().clone();
        Ok(serde_json::from_str(&body)?)
    }

    async fn push_settings(&self, derived_key: &str, settings: &PersistedSettings) -> Result<()> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("请求失败: connection refused"));
        }
        self.pushed
            .lock()
            .unwrap()
            .push((derived_key.to_string(), settings.clone()));
        Ok(())
    }
}

/// 记录所有副作用的宿主环境
#[derive(Default)]
pub struct RecordingHost {
    alerts: Mutex<Vec<String>>,
    reloads: AtomicUsize,
    languages: Mutex<Vec<String>>,
    service_worker: AtomicBool,
    registrations: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn with_service_worker() -> Self {
        let host = Self::default();
        host.service_worker.store(true, Ordering::SeqCst);
        host
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn languages(&self) -> Vec<String> {
        self.languages.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> Vec<String> {
        self.registrations.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostEnvironment for RecordingHost {
    async fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    async fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }

    async fn set_document_language(&self, language: &str) {
        self.languages.lock().unwrap().push(language.to_string());
    }

    fn supports_service_worker(&self) -> bool {
        self.service_worker.load(Ordering::SeqCst)
    }

    async fn register_service_worker(&self, script_url: &str) -> Result<String> {
        self.registrations.lock().unwrap().push(script_url.to_string());
        Ok("/".to_string())
    }
}

/// 记录回调的监听器
#[derive(Default)]
pub struct RecordingListener {
    started: AtomicUsize,
    finished: Mutex<Vec<bool>>,
    failures: Mutex<Vec<String>>,
    uploaded: Mutex<Vec<i64>>,
}

impl RecordingListener {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> Vec<bool> {
        self.finished.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }

    pub fn uploaded(&self) -> Vec<i64> {
        self.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettingsListener for RecordingListener {
    async fn on_sync_start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_sync_finish(&self, replaced: bool) {
        self.finished.lock().unwrap().push(replaced);
    }

    async fn on_sync_failed(&self, reason: String) {
        self.failures.lock().unwrap().push(reason);
    }

    async fn on_settings_uploaded(&self, cache_id: i64) {
        self.uploaded.lock().unwrap().push(cache_id);
    }
}

/// 写入次数用完后开始报错的存储
pub struct FlakyStorage {
    inner: MemoryStorage,
    writes_left: AtomicUsize,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryStorage::new(),
            writes_left: AtomicUsize::new(usize::MAX),
        }
    }

    /// 之后只允许再成功写入 n 次
    pub fn fail_writes_after(&self, n: usize) {
        self.writes_left.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocalStorage for FlakyStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let allowed = self
            .writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(anyhow::anyhow!("写入本地存储失败: quota exceeded"));
        }
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key).await
    }
}

/// 只响应一次请求的 HTTP 服务，返回服务地址和收到的原始请求
pub async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let content_length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= pos + 4 + content_length {
                    break;
                }
            }
        }
        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&buf).to_string()
    });
    (format!("http://{}", addr), handle)
}
