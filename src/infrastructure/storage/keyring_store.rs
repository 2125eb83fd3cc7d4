use crate::application::ports::key_value_store::KeyValueStore;
use crate::shared::error::AppError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use keyring::Entry;

/// OS キーチェーンを使う KeyValueStore 実装。keyring はブロッキング API
/// なので spawn_blocking 経由で呼ぶ。
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(service: &str, key: &str) -> Result<Entry> {
        Entry::new(service, key).context("Failed to create keyring entry")
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(String) -> Result<T> + Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || op(service))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(|e| AppError::Storage(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let key = key.to_string();
        self.run_blocking(move |service| {
            let entry = Self::entry(&service, &key)?;
            match entry.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(anyhow::anyhow!("Failed to read {key} from keyring: {e}")),
            }
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let key = key.to_string();
        let value = value.to_string();
        self.run_blocking(move |service| {
            let entry = Self::entry(&service, &key)?;
            entry
                .set_password(&value)
                .map_err(|e| anyhow::anyhow!("Failed to write {key} to keyring: {e}"))
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        let key = key.to_string();
        self.run_blocking(move |service| {
            let entry = Self::entry(&service, &key)?;
            match entry.delete_credential() {
                // 既に無ければそれで良い
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(anyhow::anyhow!("Failed to delete {key} from keyring: {e}")),
            }
        })
        .await
    }
}
