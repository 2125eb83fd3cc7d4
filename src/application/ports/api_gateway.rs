use crate::domain::entities::{Category, Post, PostDraft, Reply, User};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;

#[cfg(test)]
use mockall::automock;

/// ログイン成功時のペイロード
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// 登録レスポンス。バックエンドの設定によってはトークンを返さない
/// （メール確認後にログインさせる構成）ので両方 Option。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterPayload {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// リプライのワイヤ表現
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyPayload {
    pub id: i64,
    #[serde(default, alias = "postId")]
    pub post_id: Option<i64>,
    pub content: String,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub dislikes: u32,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl ReplyPayload {
    /// ドメインの Reply へ変換する。レスポンスに post_id が無い
    /// エンドポイントがあるので、呼び出し側が親 id を補う。
    pub fn into_reply(self, parent_post_id: i64) -> Reply {
        let author_id = self
            .user
            .as_ref()
            .map(|u| u.id)
            .or(self.user_id)
            .unwrap_or_default();
        Reply {
            id: self.id,
            post_id: self.post_id.unwrap_or(parent_post_id),
            content: self.content,
            likes: self.likes,
            dislikes: self.dislikes,
            author_id,
        }
    }
}

/// 投稿のワイヤ表現。リプライのフィールド名が `replies` と `reply` で
/// 揺れるため、ここで正規化してからドメインに渡す。カテゴリも
/// ネストされた場合と `category_id` のみの場合がある。
#[derive(Debug, Clone, Deserialize)]
pub struct PostPayload {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub dislikes: u32,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default, alias = "reply")]
    pub replies: Vec<ReplyPayload>,
}

impl PostPayload {
    pub fn into_parts(self) -> (Post, Vec<Reply>) {
        let author_id = self
            .user
            .as_ref()
            .map(|u| u.id)
            .or(self.user_id)
            .unwrap_or_default();
        let category_id = self.category.as_ref().map(|c| c.id).or(self.category_id);
        let post_id = self.id;
        let replies = self
            .replies
            .into_iter()
            .map(|r| r.into_reply(post_id))
            .collect();
        let post = Post {
            id: post_id,
            title: self.title,
            content: self.content,
            emoji: self.emoji,
            likes: self.likes,
            dislikes: self.dislikes,
            author_id,
            category_id,
        };
        (post, replies)
    }
}

/// フォーラムバックエンドへのゲートウェイ。HTTP トランスポートと
/// Bearer ヘッダの付与は埋め込み側シェルの実装が担う。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ForumApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<AuthPayload, AppError>;
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterPayload, AppError>;
    async fn update_username(&self, username: &str) -> Result<User, AppError>;

    async fn fetch_posts(&self) -> Result<Vec<PostPayload>, AppError>;
    async fn search_posts(&self, query: &str) -> Result<Vec<PostPayload>, AppError>;
    async fn fetch_post(&self, id: i64) -> Result<PostPayload, AppError>;
    async fn create_post(&self, draft: &PostDraft) -> Result<PostPayload, AppError>;
    async fn update_post(&self, id: i64, draft: &PostDraft) -> Result<PostPayload, AppError>;
    async fn delete_post(&self, id: i64) -> Result<(), AppError>;
    async fn like_post(&self, id: i64) -> Result<(), AppError>;
    async fn dislike_post(&self, id: i64) -> Result<(), AppError>;

    async fn create_reply(&self, post_id: i64, content: &str) -> Result<ReplyPayload, AppError>;
    async fn update_reply(&self, id: i64, content: &str) -> Result<ReplyPayload, AppError>;
    async fn delete_reply(&self, id: i64) -> Result<(), AppError>;
    async fn like_reply(&self, id: i64) -> Result<ReplyPayload, AppError>;
    async fn dislike_reply(&self, id: i64) -> Result<ReplyPayload, AppError>;

    async fn fetch_categories(&self) -> Result<Vec<Category>, AppError>;
}
