use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// セッションの有効期限（ミリ秒）。最後の authenticate を起点とし、
    /// 操作によって延長されることはない。
    pub ttl_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// 検索クエリのデバウンス幅（ミリ秒）
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// キーチェーンのサービス名
    pub service_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost/api".to_string(),
                request_timeout: 30,
            },
            session: SessionConfig {
                ttl_ms: 3_600_000, // 1 hour
            },
            search: SearchConfig { debounce_ms: 500 },
            storage: StorageConfig {
                service_name: "kaiwa".to_string(),
            },
        }
    }
}
