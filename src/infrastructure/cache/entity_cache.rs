use crate::domain::entities::{Post, Reply};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 楽観的更新のスナップショット。confirm か rollback まで保持する。
/// `prior: None` は楽観的に挿入されたエンティティを表し、rollback で
/// 丸ごと取り除く。
#[derive(Debug, Clone)]
enum Snapshot {
    Post { id: i64, prior: Option<Post> },
    Reply { id: i64, prior: Option<Reply> },
}

#[derive(Default)]
struct CacheInner {
    posts: HashMap<i64, Post>,
    replies: HashMap<i64, Reply>,
    /// post_id → 挿入順のリプライ id 列
    by_parent: HashMap<i64, Vec<i64>>,
    /// 検索・一覧表示の並び
    listing: Vec<i64>,
    pending: HashMap<Uuid, Snapshot>,
}

impl CacheInner {
    fn index_reply(&mut self, post_id: i64, reply_id: i64) {
        let index = self.by_parent.entry(post_id).or_default();
        if !index.contains(&reply_id) {
            index.push(reply_id);
        }
    }

    fn unindex_reply(&mut self, post_id: i64, reply_id: i64) {
        if let Some(index) = self.by_parent.get_mut(&post_id) {
            index.retain(|id| *id != reply_id);
            if index.is_empty() {
                self.by_parent.remove(&post_id);
            }
        }
    }

    fn insert_reply(&mut self, reply: Reply) {
        // 親が変わる編集はワイヤ上存在しないが、索引の一貫性だけは守る
        if let Some(old) = self.replies.get(&reply.id) {
            if old.post_id != reply.post_id {
                let (old_post_id, old_id) = (old.post_id, old.id);
                self.unindex_reply(old_post_id, old_id);
            }
        }
        self.index_reply(reply.post_id, reply.id);
        self.replies.insert(reply.id, reply);
    }

    fn remove_reply(&mut self, id: i64) -> Option<Reply> {
        let removed = self.replies.remove(&id)?;
        self.unindex_reply(removed.post_id, removed.id);
        Some(removed)
    }

    fn remove_post(&mut self, id: i64) -> Option<Post> {
        let removed = self.posts.remove(&id)?;
        self.listing.retain(|listed| *listed != id);
        if let Some(reply_ids) = self.by_parent.remove(&id) {
            for reply_id in reply_ids {
                self.replies.remove(&reply_id);
            }
        }
        Some(removed)
    }
}

/// 投稿とリプライのインメモリキャッシュ。描画側から見た唯一の真実で、
/// ネットワークには一切触れない。サーバ確定値での置き換え以外の変更は
/// 楽観的更新として台帳を通す。
#[derive(Clone, Default)]
pub struct EntityCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_post(&self, id: i64) -> Option<Post> {
        let inner = self.inner.read().await;
        inner.posts.get(&id).cloned()
    }

    /// サーバ確定値での挿入・置き換え
    pub async fn put_post(&self, post: Post) {
        let mut inner = self.inner.write().await;
        if !inner.listing.contains(&post.id) {
            inner.listing.push(post.id);
        }
        inner.posts.insert(post.id, post);
    }

    pub async fn remove_post(&self, id: i64) -> Option<Post> {
        let mut inner = self.inner.write().await;
        inner.remove_post(id)
    }

    pub async fn get_reply(&self, id: i64) -> Option<Reply> {
        let inner = self.inner.read().await;
        inner.replies.get(&id).cloned()
    }

    /// サーバ確定値での挿入・置き換え。親索引は重複なしで維持する。
    pub async fn put_reply(&self, reply: Reply) {
        let mut inner = self.inner.write().await;
        inner.insert_reply(reply);
    }

    pub async fn remove_reply(&self, id: i64) -> Option<Reply> {
        let mut inner = self.inner.write().await;
        inner.remove_reply(id)
    }

    /// 親投稿に紐づくリプライを挿入順で返す
    pub async fn list_by_parent(&self, post_id: i64) -> Vec<Reply> {
        let inner = self.inner.read().await;
        inner
            .by_parent
            .get(&post_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.replies.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 一覧の並び順で投稿を返す
    pub async fn listing(&self) -> Vec<Post> {
        let inner = self.inner.read().await;
        inner
            .listing
            .iter()
            .filter_map(|id| inner.posts.get(id).cloned())
            .collect()
    }

    /// 検索結果で一覧を丸ごと差し替える
    pub async fn replace_listing(&self, posts: Vec<Post>) {
        let mut inner = self.inner.write().await;
        inner.listing = posts.iter().map(|p| p.id).collect();
        for post in posts {
            inner.posts.insert(post.id, post);
        }
    }

    /// 投稿詳細の再取得結果で、投稿とそのリプライ集合を置き換える
    pub async fn replace_post_with_replies(&self, post: Post, replies: Vec<Reply>) {
        let mut inner = self.inner.write().await;
        let post_id = post.id;
        if !inner.listing.contains(&post_id) {
            inner.listing.push(post_id);
        }
        inner.posts.insert(post_id, post);

        if let Some(old_ids) = inner.by_parent.remove(&post_id) {
            for old_id in old_ids {
                inner.replies.remove(&old_id);
            }
        }
        for reply in replies {
            inner.insert_reply(reply);
        }
    }

    /// 楽観的更新を適用し、直前のエントリをスナップショットする。
    /// 返る id で confirm / rollback を行う。
    pub async fn apply_optimistic_post(&self, post: Post) -> Uuid {
        let mut inner = self.inner.write().await;
        let update_id = Uuid::new_v4();
        let prior = inner.posts.get(&post.id).cloned();
        inner.pending.insert(
            update_id,
            Snapshot::Post {
                id: post.id,
                prior,
            },
        );
        if !inner.listing.contains(&post.id) {
            inner.listing.push(post.id);
        }
        inner.posts.insert(post.id, post);
        update_id
    }

    pub async fn apply_optimistic_reply(&self, reply: Reply) -> Uuid {
        let mut inner = self.inner.write().await;
        let update_id = Uuid::new_v4();
        let prior = inner.replies.get(&reply.id).cloned();
        inner.pending.insert(
            update_id,
            Snapshot::Reply {
                id: reply.id,
                prior,
            },
        );
        inner.insert_reply(reply);
        update_id
    }

    /// 楽観的更新を確定し、スナップショットを破棄する
    pub async fn confirm(&self, update_id: Uuid) {
        let mut inner = self.inner.write().await;
        inner.pending.remove(&update_id);
    }

    /// 楽観的更新を巻き戻し、直前のエントリを正確に復元する
    pub async fn rollback(&self, update_id: Uuid) {
        let mut inner = self.inner.write().await;
        let Some(snapshot) = inner.pending.remove(&update_id) else {
            return;
        };
        match snapshot {
            Snapshot::Post { id, prior } => match prior {
                Some(post) => {
                    inner.posts.insert(id, post);
                }
                None => {
                    inner.remove_post(id);
                }
            },
            Snapshot::Reply { id, prior } => match prior {
                Some(reply) => {
                    inner.insert_reply(reply);
                }
                None => {
                    inner.remove_reply(id);
                }
            },
        }
    }
}
