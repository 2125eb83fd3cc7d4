use super::user::User;
use chrono::{DateTime, Utc};

/// 認証済みセッション。ストアに `api_token` と `current_user` の両方が
/// 揃っているときだけ存在する。
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: String, user: User) -> Self {
        Self {
            token,
            user,
            issued_at: Utc::now(),
        }
    }
}
