use crate::application::ports::api_gateway::ForumApi;
use crate::application::ports::key_value_store::KeyValueStore;
use crate::domain::entities::{Session, User};
use crate::shared::config::SessionConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;

pub const TOKEN_KEY: &str = "api_token";
pub const USER_KEY: &str = "current_user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// TTL 超過による自動失効
    Expired,
    /// 明示的なサインアウト、または 401 による失効
    Invalidated,
}

struct SessionInner {
    session: Option<Session>,
    expiry: Option<JoinHandle<()>>,
}

/// 認証セッションの唯一の所有者。トークンとユーザの永続化、
/// インメモリ状態、固定 TTL の失効タイマーを束ねる。
/// ストアのキーを直接触って良いのはこのサービスだけ。
#[derive(Clone)]
pub struct SessionService {
    api: Arc<dyn ForumApi>,
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    inner: Arc<Mutex<SessionInner>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionService {
    pub fn new(
        api: Arc<dyn ForumApi>,
        store: Arc<dyn KeyValueStore>,
        config: &SessionConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            api,
            store,
            ttl: Duration::from_millis(config.ttl_ms),
            inner: Arc::new(Mutex::new(SessionInner {
                session: None,
                expiry: None,
            })),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// プロセス起動時の復元。トークンとユーザが両方揃っているときだけ
    /// セッションを作り、この呼び出し時点を起点に失効タイマーを張る。
    /// 読み出し失敗は「セッションなし」に落とす（fail-safe）。
    pub async fn initialize(&self) -> Option<Session> {
        let token = match self.store.get(TOKEN_KEY).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Session restore failed reading token: {e}");
                return None;
            }
        };
        let user_json = match self.store.get(USER_KEY).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Session restore failed reading user: {e}");
                return None;
            }
        };
        let (Some(token), Some(user_json)) = (token, user_json) else {
            return None;
        };
        let user: User = match serde_json::from_str(&user_json) {
            Ok(user) => user,
            Err(e) => {
                warn!("Persisted user record is unreadable: {e}");
                return None;
            }
        };

        let session = Session::new(token, user);
        let mut inner = self.inner.lock().await;
        inner.session = Some(session.clone());
        self.restart_expiry(&mut inner);
        Some(session)
    }

    /// トークンとユーザを永続化してからセッションを有効にする。
    /// 片方の書き込みに失敗したら、もう片方も残さない。
    ///
    /// ストアの書き込みはロックを保持したまま行う。失効タスクの鍵削除と
    /// 交錯すると、新しいセッションの鍵だけが消えることがある。
    pub async fn authenticate(&self, token: String, user: User) -> Result<Session, AppError> {
        let mut inner = self.inner.lock().await;
        self.store.set(TOKEN_KEY, &token).await?;
        let user_json = serde_json::to_string(&user)?;
        if let Err(err) = self.store.set(USER_KEY, &user_json).await {
            let _ = self.store.remove(TOKEN_KEY).await;
            return Err(err);
        }

        let session = Session::new(token, user);
        inner.session = Some(session.clone());
        self.restart_expiry(&mut inner);
        Ok(session)
    }

    /// セッションを破棄する。セッションが無い状態で呼んでも何も起きない。
    pub async fn invalidate(&self) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.expiry.take() {
            handle.abort();
        }
        let had_session = inner.session.take().is_some();
        self.store.remove(TOKEN_KEY).await?;
        self.store.remove(USER_KEY).await?;
        drop(inner);

        if had_session {
            let _ = self.events.send(SessionEvent::Invalidated);
        }
        Ok(())
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.inner.lock().await.session.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.lock().await.session.is_some()
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<Session, AppError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Username and password are required".to_string(),
            ));
        }
        let payload = self.api.login(username, password).await?;
        self.authenticate(payload.token, payload.user).await
    }

    /// 登録。バックエンドがトークンとユーザを両方返したときだけ
    /// そのままサインインし、そうでなければセッションは作らない。
    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<Session>, AppError> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Username, email and password are required".to_string(),
            ));
        }
        let payload = self.api.register(username, email, password).await?;
        match (payload.token, payload.user) {
            (Some(token), Some(user)) => Ok(Some(self.authenticate(token, user).await?)),
            _ => Ok(None),
        }
    }

    /// ユーザ名の更新。キャッシュにはサーバが確定したユーザ名だけを
    /// 反映し、ローカルの推測値では置き換えない。永続化が失敗したら
    /// メモリ上のセッションも更新しない。
    pub async fn update_username(&self, username: &str) -> Result<User, AppError> {
        if username.trim().is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }
        let user = self.api.update_username(username).await?;

        let mut inner = self.inner.lock().await;
        if inner.session.is_some() {
            let user_json = serde_json::to_string(&user)?;
            self.store.set(USER_KEY, &user_json).await?;
            if let Some(session) = inner.session.as_mut() {
                session.user = user.clone();
            }
        }
        Ok(user)
    }

    /// リモートが 401 を返したときの失効経路。invalidate は冪等なので
    /// 失効タイマーと競合しても二重に壊れることはない。
    pub async fn on_auth_failure(&self) {
        if let Err(e) = self.invalidate().await {
            warn!("Failed to clear session after auth failure: {e}");
        }
    }

    /// 失効タイマーを張り直す。生きているタイマーは常に一つ。
    fn restart_expiry(&self, inner: &mut SessionInner) {
        if let Some(handle) = inner.expiry.take() {
            handle.abort();
        }
        let service = self.clone();
        let ttl = self.ttl;
        inner.expiry = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            service.expire().await;
        }));
    }

    /// タイマー発火時の失効。自分自身のハンドルは abort せずに捨てる
    /// （abort すると進行中のストア削除ごと切られる）。鍵の削除まで
    /// ロックを保持し、割り込んだ再認証が書いた鍵を消さないようにする。
    async fn expire(self) {
        let mut inner = self.inner.lock().await;
        inner.expiry.take();
        if inner.session.take().is_none() {
            return;
        }
        if let Err(e) = self.store.remove(TOKEN_KEY).await {
            warn!("Failed to clear token on expiry: {e}");
        }
        if let Err(e) = self.store.remove(USER_KEY).await {
            warn!("Failed to clear user on expiry: {e}");
        }
        drop(inner);
        let _ = self.events.send(SessionEvent::Expired);
    }
}
