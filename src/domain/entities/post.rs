use serde::{Deserialize, Serialize};

/// 投稿。リプライは `Reply.post_id` 経由の参照関係であり、
/// 投稿自身は子リストを持たない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub emoji: Option<String>,
    pub likes: u32,
    pub dislikes: u32,
    pub author_id: i64,
    pub category_id: Option<i64>,
}

impl Post {
    pub fn increment_likes(&mut self) {
        self.likes += 1;
    }

    pub fn increment_dislikes(&mut self) {
        self.dislikes += 1;
    }
}

/// 投稿の作成・編集フォームの入力値。サーバへ送る下書きであって、
/// 成功時はサーバが返した投稿でキャッシュを上書きする。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl PostDraft {
    pub fn new(title: String, content: String, category_id: Option<i64>) -> Self {
        Self {
            title,
            content,
            category_id,
            emoji: None,
        }
    }

    pub fn with_emoji(mut self, emoji: String) -> Self {
        self.emoji = Some(emoji);
        self
    }
}
