use crate::application::ports::api_gateway::ForumApi;
use crate::application::services::session_service::SessionService;
use crate::domain::entities::{Post, PostDraft, Reply, User};
use crate::infrastructure::cache::EntityCache;
use crate::shared::config::SearchConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

struct SearchState {
    /// 生きているクエリの世代。古い世代の結果はキャッシュに触れない。
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// 変更系のリモート呼び出しを楽観的更新とリコンサイルで包む調整役。
/// キャッシュの変更はすべてここを通り、失敗は呼び出し元へそのまま
/// 伝播する（リトライはしない）。
#[derive(Clone)]
pub struct SyncService {
    api: Arc<dyn ForumApi>,
    cache: EntityCache,
    session: Arc<SessionService>,
    debounce: Duration,
    search: Arc<Mutex<SearchState>>,
}

impl SyncService {
    pub fn new(
        api: Arc<dyn ForumApi>,
        cache: EntityCache,
        session: Arc<SessionService>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            api,
            cache,
            session,
            debounce: Duration::from_millis(config.debounce_ms),
            search: Arc::new(Mutex::new(SearchState {
                generation: 0,
                pending: None,
            })),
        }
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// 401 はセッション失効に落としてからエラーを返す
    async fn guard<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(err) = &result {
            if err.is_auth() {
                self.session.on_auth_failure().await;
            }
        }
        result
    }

    // ============= 検索 =============

    /// クエリの変更ごとにデバウンスタイマーを張り直す。タイマーが
    /// 満了した時点のクエリだけが送信され、満了前に次のクエリが来たら
    /// 前のタイマーごと破棄される。
    pub async fn search(&self, text: &str) {
        let query = text.trim().to_string();
        let mut search = self.search.lock().await;
        search.generation += 1;
        let generation = search.generation;
        if let Some(handle) = search.pending.take() {
            handle.abort();
        }
        let service = self.clone();
        search.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(service.debounce).await;
            service.run_search(generation, query).await;
        }));
    }

    /// ビューのアンマウント時に呼ぶ。保留中のタイマーを破棄し、
    /// 飛行中のレスポンスが後から届いても適用されないようにする。
    pub async fn cancel_search(&self) {
        let mut search = self.search.lock().await;
        search.generation += 1;
        if let Some(handle) = search.pending.take() {
            handle.abort();
        }
    }

    async fn run_search(&self, generation: u64, query: String) {
        {
            // 送信と同時にタイマーの座を明け渡す。以降このタスクは
            // abort されず、古くなった結果は世代比較で捨てられる。
            let mut search = self.search.lock().await;
            if search.generation != generation {
                return;
            }
            search.pending = None;
        }

        let result = if query.is_empty() {
            self.api.fetch_posts().await
        } else {
            self.api.search_posts(&query).await
        };
        let payloads = match self.guard(result).await {
            Ok(payloads) => payloads,
            Err(err) => {
                warn!("Search for {query:?} failed: {err}");
                return;
            }
        };

        // 完了時点でまだ自分の世代か確認してから適用する
        {
            let search = self.search.lock().await;
            if search.generation != generation {
                return;
            }
        }

        let posts = payloads
            .into_iter()
            .map(|payload| payload.into_parts().0)
            .collect();
        self.cache.replace_listing(posts).await;
    }

    // ============= 投稿 =============

    /// 投稿詳細の取得。ネストされたリプライはここで正規化され、
    /// キャッシュの投稿とリプライ集合を丸ごと置き換える。
    pub async fn refresh_post(&self, id: i64) -> Result<Post, AppError> {
        let payload = self.guard(self.api.fetch_post(id).await).await?;
        let (post, replies) = payload.into_parts();
        self.cache
            .replace_post_with_replies(post.clone(), replies)
            .await;
        Ok(post)
    }

    /// 作成は楽観的反映をしない。成功時にサーバが返した投稿だけを
    /// キャッシュに入れ、下書きの値は使わない。
    pub async fn create_post(&self, draft: PostDraft) -> Result<Post, AppError> {
        Self::validate_post_draft(&draft)?;
        let payload = self.guard(self.api.create_post(&draft).await).await?;
        let (post, _) = payload.into_parts();
        self.cache.put_post(post.clone()).await;
        Ok(post)
    }

    pub async fn update_post(&self, id: i64, draft: PostDraft) -> Result<Post, AppError> {
        Self::validate_post_draft(&draft)?;
        let payload = self.guard(self.api.update_post(id, &draft).await).await?;
        let (post, _) = payload.into_parts();
        self.cache.put_post(post.clone()).await;
        Ok(post)
    }

    /// 削除は先回りしない。サーバが確定するまでキャッシュに残すことで、
    /// 失敗時に項目が消えたまま戻らない事故を防ぐ。
    pub async fn delete_post(&self, id: i64) -> Result<(), AppError> {
        self.guard(self.api.delete_post(id).await).await?;
        self.cache.remove_post(id).await;
        Ok(())
    }

    pub async fn like_post(&self, id: i64) -> Result<(), AppError> {
        self.vote_post(id, Vote::Like).await
    }

    pub async fn dislike_post(&self, id: i64) -> Result<(), AppError> {
        self.vote_post(id, Vote::Dislike).await
    }

    /// 投票はカウンタを即時インクリメントして遅延を隠す。投稿の投票
    /// エンドポイントはボディを返さないため、成功後に再取得して
    /// サーバ確定値でカウンタを置き換える（楽観値を信用し続けない）。
    async fn vote_post(&self, id: i64, vote: Vote) -> Result<(), AppError> {
        let Some(current) = self.cache.get_post(id).await else {
            return Err(AppError::NotFound(format!("Post {id} is not cached")));
        };

        let mut optimistic = current.clone();
        match vote {
            Vote::Like => optimistic.increment_likes(),
            Vote::Dislike => optimistic.increment_dislikes(),
        }
        let update_id = self.cache.apply_optimistic_post(optimistic).await;

        let call = match vote {
            Vote::Like => self.api.like_post(id).await,
            Vote::Dislike => self.api.dislike_post(id).await,
        };
        match self.guard(call).await {
            Ok(()) => {
                self.cache.confirm(update_id).await;
                match self.guard(self.api.fetch_post(id).await).await {
                    Ok(payload) => {
                        let (post, replies) = payload.into_parts();
                        self.cache.replace_post_with_replies(post, replies).await;
                    }
                    Err(err) => warn!("Vote reconciliation for post {id} failed: {err}"),
                }
                Ok(())
            }
            Err(err) => {
                self.cache.rollback(update_id).await;
                Err(err)
            }
        }
    }

    // ============= リプライ =============

    pub async fn create_reply(&self, post_id: i64, content: &str) -> Result<Reply, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::Validation(
                "Reply content cannot be empty".to_string(),
            ));
        }
        let payload = self
            .guard(self.api.create_reply(post_id, content).await)
            .await?;
        let reply = payload.into_reply(post_id);
        self.cache.put_reply(reply.clone()).await;
        Ok(reply)
    }

    pub async fn update_reply(&self, id: i64, content: &str) -> Result<Reply, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::Validation(
                "Reply content cannot be empty".to_string(),
            ));
        }
        let Some(current) = self.cache.get_reply(id).await else {
            return Err(AppError::NotFound(format!("Reply {id} is not cached")));
        };
        let payload = self.guard(self.api.update_reply(id, content).await).await?;
        let reply = payload.into_reply(current.post_id);
        self.cache.put_reply(reply.clone()).await;
        Ok(reply)
    }

    pub async fn delete_reply(&self, id: i64) -> Result<(), AppError> {
        self.guard(self.api.delete_reply(id).await).await?;
        self.cache.remove_reply(id).await;
        Ok(())
    }

    pub async fn like_reply(&self, id: i64) -> Result<Reply, AppError> {
        self.vote_reply(id, Vote::Like).await
    }

    pub async fn dislike_reply(&self, id: i64) -> Result<Reply, AppError> {
        self.vote_reply(id, Vote::Dislike).await
    }

    /// リプライの投票エンドポイントは更新後のリプライを返すので、
    /// それでそのままリコンサイルする。
    async fn vote_reply(&self, id: i64, vote: Vote) -> Result<Reply, AppError> {
        let Some(current) = self.cache.get_reply(id).await else {
            return Err(AppError::NotFound(format!("Reply {id} is not cached")));
        };

        let mut optimistic = current.clone();
        match vote {
            Vote::Like => optimistic.increment_likes(),
            Vote::Dislike => optimistic.increment_dislikes(),
        }
        let update_id = self.cache.apply_optimistic_reply(optimistic).await;

        let call = match vote {
            Vote::Like => self.api.like_reply(id).await,
            Vote::Dislike => self.api.dislike_reply(id).await,
        };
        match self.guard(call).await {
            Ok(payload) => {
                let reply = payload.into_reply(current.post_id);
                self.cache.confirm(update_id).await;
                self.cache.put_reply(reply.clone()).await;
                Ok(reply)
            }
            Err(err) => {
                self.cache.rollback(update_id).await;
                Err(err)
            }
        }
    }

    // ============= ユーザ =============

    pub async fn update_username(&self, username: &str) -> Result<User, AppError> {
        self.guard(self.session.update_username(username).await)
            .await
    }

    fn validate_post_draft(draft: &PostDraft) -> Result<(), AppError> {
        if draft.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if draft.content.trim().is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }
        Ok(())
    }
}

enum Vote {
    Like,
    Dislike,
}
