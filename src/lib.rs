// モジュール定義
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::api_gateway::ForumApi;
pub use application::ports::key_value_store::KeyValueStore;
pub use application::services::{CategoryService, SessionEvent, SessionService, SyncService};
pub use domain::entities::{Category, Post, PostDraft, Reply, Session, User};
pub use infrastructure::cache::EntityCache;
pub use shared::{AppConfig, AppError, Result};
pub use state::AppState;

/// ログ設定の初期化。埋め込み側シェルの起動時に一度だけ呼ぶ。
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kaiwa=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
