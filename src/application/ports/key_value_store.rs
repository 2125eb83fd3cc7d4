use crate::shared::error::AppError;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// スコープ付き key/value の永続ストア。トークンとユーザレコードの
/// 保存にだけ使い、書き込みは SessionService が単独で所有する。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    /// 存在しないキーの削除はエラーにしない
    async fn remove(&self, key: &str) -> Result<(), AppError>;
}
