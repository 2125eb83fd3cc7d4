use crate::application::ports::key_value_store::KeyValueStore;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// キーチェーンが使えない環境（WSL・一部 CI）向けのファイルフォールバック。
/// 値を平文で書くため本番ビルドでの利用は想定しない。
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// `~/.local/share/<service>/storage` 相当の既定パスで作る
    pub fn with_default_dir(service: &str) -> Self {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(service);
        path.push("storage");
        Self::new(path)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!("Failed to read {path:?}: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create storage dir: {e}")))?;
        let path = self.path_for(key);
        debug!("FileStore: writing {path:?}");
        tokio::fs::write(&path, value)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {path:?}: {e}")))
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to delete {path:?}: {e}"))),
        }
    }
}
