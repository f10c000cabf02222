//! 本地键值存储
//!
//! 对应浏览器的 localStorage：字符串 key 到字符串 value 的持久化映射。

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// 本地键值存储接口
#[async_trait]
pub trait LocalStorage: Send + Sync {
    /// 读取 key 对应的值，不存在时返回 None
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// 写入（覆盖）key 对应的值
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// 删除 key
    async fn remove_item(&self, key: &str) -> Result<()>;
}

/// 基于 SQLite 的本地存储（sqlx）
pub struct SqliteStorage {
    db: Pool<Sqlite>,
}

impl SqliteStorage {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LocalStorage for SqliteStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("读取本地存储失败: {}", key))?;

        match row {
            Some(row) => Ok(Some(row.try_get::<String, _>("value")?)),
            None => Ok(None),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.db)
        .await
        .with_context(|| format!("写入本地存储失败: {}", key))?;

        debug!("[Storage] 写入 key={}, 长度={}", key, value.len());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(key)
            .execute(&self.db)
            .await
            .with_context(|| format!("删除本地存储失败: {}", key))?;
        Ok(())
    }
}

/// 内存实现，不落盘
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("内存存储锁已损坏"))?;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("内存存储锁已损坏"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("内存存储锁已损坏"))?;
        items.remove(key);
        Ok(())
    }
}
