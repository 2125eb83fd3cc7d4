use serde::{Deserialize, Serialize};

/// リプライ。親投稿とは `post_id` のみで結ばれ、識別子は常に自身の id。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub likes: u32,
    pub dislikes: u32,
    pub author_id: i64,
}

impl Reply {
    pub fn increment_likes(&mut self) {
        self.likes += 1;
    }

    pub fn increment_dislikes(&mut self) {
        self.dislikes += 1;
    }
}
