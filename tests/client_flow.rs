use async_trait::async_trait;
use kaiwa_client_lib::application::ports::api_gateway::{
    AuthPayload, ForumApi, PostPayload, RegisterPayload, ReplyPayload,
};
use kaiwa_client_lib::infrastructure::storage::MemoryStore;
use kaiwa_client_lib::shared::error::AppError;
use kaiwa_client_lib::{AppConfig, AppState, Category, KeyValueStore, PostDraft, User};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct Backend {
    posts: HashMap<i64, (String, String, u32)>, // title, content, likes
    replies: HashMap<i64, (i64, String, u32)>,  // post_id, content, likes
    next_id: i64,
}

/// 決め打ちの応答を返すバックエンドの代役。HTTP には触れない。
#[derive(Default)]
struct FakeApi {
    backend: Mutex<Backend>,
    fail_next: AtomicBool,
}

impl FakeApi {
    fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<(), AppError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(AppError::Network("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn post_payload(id: i64, title: &str, content: &str, likes: u32) -> PostPayload {
        PostPayload {
            id,
            title: title.to_string(),
            content: content.to_string(),
            emoji: None,
            likes,
            dislikes: 0,
            user: Some(User::new(1, "aki".to_string(), "aki@example.com".to_string())),
            user_id: None,
            category: None,
            category_id: Some(1),
            replies: vec![],
        }
    }

    async fn list_posts(&self, query: Option<&str>) -> Result<Vec<PostPayload>, AppError> {
        self.check_failure()?;
        let backend = self.backend.lock().await;
        let mut payloads: Vec<PostPayload> = backend
            .posts
            .iter()
            .filter(|(_, (title, _, _))| match query {
                Some(q) => title.contains(q),
                None => true,
            })
            .map(|(id, (title, content, likes))| Self::post_payload(*id, title, content, *likes))
            .collect();
        payloads.sort_by_key(|p| p.id);
        Ok(payloads)
    }

    fn reply_payload(id: i64, post_id: i64, content: &str, likes: u32) -> ReplyPayload {
        ReplyPayload {
            id,
            post_id: Some(post_id),
            content: content.to_string(),
            likes,
            dislikes: 0,
            user: None,
            user_id: Some(1),
        }
    }
}

#[async_trait]
impl ForumApi for FakeApi {
    async fn login(&self, username: &str, _password: &str) -> Result<AuthPayload, AppError> {
        self.check_failure()?;
        Ok(AuthPayload {
            token: "t0k3n".to_string(),
            user: User::new(1, username.to_string(), format!("{username}@example.com")),
        })
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        _password: &str,
    ) -> Result<RegisterPayload, AppError> {
        self.check_failure()?;
        Ok(RegisterPayload {
            token: Some("t0k3n".to_string()),
            user: Some(User::new(2, username.to_string(), email.to_string())),
        })
    }

    async fn update_username(&self, username: &str) -> Result<User, AppError> {
        self.check_failure()?;
        Ok(User::new(1, username.to_string(), "aki@example.com".to_string()))
    }

    async fn fetch_posts(&self) -> Result<Vec<PostPayload>, AppError> {
        self.list_posts(None).await
    }

    async fn search_posts(&self, query: &str) -> Result<Vec<PostPayload>, AppError> {
        self.list_posts(Some(query)).await
    }

    async fn fetch_post(&self, id: i64) -> Result<PostPayload, AppError> {
        self.check_failure()?;
        let backend = self.backend.lock().await;
        let (title, content, likes) = backend
            .posts
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
        let mut payload = Self::post_payload(id, &title, &content, likes);
        payload.replies = backend
            .replies
            .iter()
            .filter(|(_, (post_id, _, _))| *post_id == id)
            .map(|(reply_id, (post_id, content, likes))| {
                Self::reply_payload(*reply_id, *post_id, content, *likes)
            })
            .collect();
        payload.replies.sort_by_key(|r| r.id);
        Ok(payload)
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<PostPayload, AppError> {
        self.check_failure()?;
        let mut backend = self.backend.lock().await;
        backend.next_id += 1;
        let id = backend.next_id;
        backend
            .posts
            .insert(id, (draft.title.clone(), draft.content.clone(), 0));
        Ok(Self::post_payload(id, &draft.title, &draft.content, 0))
    }

    async fn update_post(&self, id: i64, draft: &PostDraft) -> Result<PostPayload, AppError> {
        self.check_failure()?;
        let mut backend = self.backend.lock().await;
        let entry = backend
            .posts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
        entry.0 = draft.title.clone();
        entry.1 = draft.content.clone();
        let likes = entry.2;
        Ok(Self::post_payload(id, &draft.title, &draft.content, likes))
    }

    async fn delete_post(&self, id: i64) -> Result<(), AppError> {
        self.check_failure()?;
        let mut backend = self.backend.lock().await;
        backend.posts.remove(&id);
        Ok(())
    }

    async fn like_post(&self, id: i64) -> Result<(), AppError> {
        self.check_failure()?;
        let mut backend = self.backend.lock().await;
        if let Some(entry) = backend.posts.get_mut(&id) {
            entry.2 += 1;
        }
        Ok(())
    }

    async fn dislike_post(&self, _id: i64) -> Result<(), AppError> {
        self.check_failure()
    }

    async fn create_reply(&self, post_id: i64, content: &str) -> Result<ReplyPayload, AppError> {
        self.check_failure()?;
        let mut backend = self.backend.lock().await;
        backend.next_id += 1;
        let id = backend.next_id;
        backend
            .replies
            .insert(id, (post_id, content.to_string(), 0));
        Ok(Self::reply_payload(id, post_id, content, 0))
    }

    async fn update_reply(&self, id: i64, content: &str) -> Result<ReplyPayload, AppError> {
        self.check_failure()?;
        let mut backend = self.backend.lock().await;
        let entry = backend
            .replies
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("reply {id}")))?;
        entry.1 = content.to_string();
        let (post_id, likes) = (entry.0, entry.2);
        Ok(Self::reply_payload(id, post_id, content, likes))
    }

    async fn delete_reply(&self, id: i64) -> Result<(), AppError> {
        self.check_failure()?;
        let mut backend = self.backend.lock().await;
        backend.replies.remove(&id);
        Ok(())
    }

    async fn like_reply(&self, id: i64) -> Result<ReplyPayload, AppError> {
        self.check_failure()?;
        let mut backend = self.backend.lock().await;
        let entry = backend
            .replies
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("reply {id}")))?;
        entry.2 += 1;
        let (post_id, content, likes) = (entry.0, entry.1.clone(), entry.2);
        Ok(Self::reply_payload(id, post_id, &content, likes))
    }

    async fn dislike_reply(&self, id: i64) -> Result<ReplyPayload, AppError> {
        self.check_failure()?;
        let backend = self.backend.lock().await;
        let entry = backend
            .replies
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("reply {id}")))?;
        Ok(Self::reply_payload(id, entry.0, &entry.1, entry.2))
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, AppError> {
        self.check_failure()?;
        Ok(vec![Category {
            id: 1,
            name: "general".to_string(),
        }])
    }
}

fn app_with(api: Arc<FakeApi>, store: Arc<MemoryStore>) -> AppState {
    AppState::with_store(api, store, &AppConfig::default())
}

#[tokio::test]
async fn session_survives_a_restart() {
    let api = Arc::new(FakeApi::default());
    let store = Arc::new(MemoryStore::new());

    let app = app_with(api.clone(), store.clone());
    let session = app.session.sign_in("aki", "secret").await.expect("sign in");
    assert_eq!(session.token, "t0k3n");

    // 再起動を新しい AppState で模す
    let restarted = app_with(api, store);
    let restored = restarted.session.initialize().await.expect("restored");
    assert_eq!(restored.token, "t0k3n");
    assert_eq!(restored.user.username, "aki");
}

#[tokio::test]
async fn post_and_reply_flow_reconciles_with_server_state() {
    let api = Arc::new(FakeApi::default());
    let app = app_with(api.clone(), Arc::new(MemoryStore::new()));
    app.session.sign_in("aki", "secret").await.expect("sign in");

    let draft = PostDraft::new("Hello".to_string(), "first post".to_string(), Some(1));
    let post = app.sync.create_post(draft).await.expect("create post");

    let reply = app
        .sync
        .create_reply(post.id, "welcome")
        .await
        .expect("create reply");
    assert_eq!(app.cache.list_by_parent(post.id).await.len(), 1);

    // 失敗した投票はカウンタを元に戻す
    api.fail_next();
    let result = app.sync.like_post(post.id).await;
    assert!(result.is_err());
    assert_eq!(app.cache.get_post(post.id).await.unwrap().likes, 0);

    // 成功した投票はサーバ確定値を映す
    app.sync.like_post(post.id).await.expect("like post");
    assert_eq!(app.cache.get_post(post.id).await.unwrap().likes, 1);

    // リプライの投票は返ってきたリプライでリコンサイル
    let voted = app.sync.like_reply(reply.id).await.expect("like reply");
    assert_eq!(voted.likes, 1);

    // 削除はサーバ確定後にだけキャッシュから消える
    app.sync.delete_reply(reply.id).await.expect("delete reply");
    assert!(app.cache.get_reply(reply.id).await.is_none());
    assert!(app.cache.list_by_parent(post.id).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn debounced_search_sends_only_the_last_query() {
    let api = Arc::new(FakeApi::default());
    let app = app_with(api.clone(), Arc::new(MemoryStore::new()));

    {
        let mut backend = api.backend.lock().await;
        backend.next_id = 2;
        backend
            .posts
            .insert(1, ("abc news".to_string(), "body".to_string(), 0));
        backend
            .posts
            .insert(2, ("unrelated".to_string(), "body".to_string(), 0));
    }

    app.sync.search("a").await;
    app.sync.search("ab").await;
    app.sync.search("abc").await;

    tokio::time::sleep(Duration::from_millis(600)).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    let ids: Vec<i64> = app.cache.listing().await.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn expired_session_is_signed_out_everywhere() {
    let api = Arc::new(FakeApi::default());
    let store = Arc::new(MemoryStore::new());
    let app = app_with(api, store.clone());

    app.session.sign_in("aki", "secret").await.expect("sign in");
    let mut events = app.session.subscribe();

    tokio::time::sleep(Duration::from_millis(3_600_001)).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    assert!(!app.session.is_authenticated().await);
    assert_eq!(store.get("api_token").await.unwrap(), None);
    assert_eq!(
        events.recv().await.unwrap(),
        kaiwa_client_lib::SessionEvent::Expired
    );
}
