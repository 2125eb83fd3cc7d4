use serde::{Deserialize, Serialize};

/// 読み取り専用の参照データ。表示時のルックアップにのみ使う。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}
