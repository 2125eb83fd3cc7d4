use crate::application::ports::api_gateway::ForumApi;
use crate::application::ports::key_value_store::KeyValueStore;
use crate::application::services::{CategoryService, SessionService, SyncService};
use crate::infrastructure::cache::EntityCache;
use crate::infrastructure::storage::KeyringStore;
use crate::shared::config::AppConfig;
use std::sync::Arc;

/// アプリケーション全体の状態。プロセス起動時に一度だけ構築し、
/// 利用側にはハンドルとして渡す。グローバルには置かない。
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionService>,
    pub sync: SyncService,
    pub categories: CategoryService,
    pub cache: EntityCache,
}

impl AppState {
    /// OS キーチェーンを永続ストアとして使う既定の構成
    pub fn new(api: Arc<dyn ForumApi>, config: &AppConfig) -> Self {
        let store = Arc::new(KeyringStore::new(config.storage.service_name.clone()));
        Self::with_store(api, store, config)
    }

    /// ストアを差し替えたい構成（テスト、キーチェーンの無い環境）
    pub fn with_store(
        api: Arc<dyn ForumApi>,
        store: Arc<dyn KeyValueStore>,
        config: &AppConfig,
    ) -> Self {
        let cache = EntityCache::new();
        let session = Arc::new(SessionService::new(api.clone(), store, &config.session));
        let sync = SyncService::new(api.clone(), cache.clone(), session.clone(), &config.search);
        let categories = CategoryService::new(api);

        Self {
            session,
            sync,
            categories,
            cache,
        }
    }
}
