use crate::application::ports::api_gateway::ForumApi;
use crate::domain::entities::Category;
use crate::shared::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// カテゴリの参照データサービス。取得して id で引くだけで、
/// ローカルでの変更はない。
#[derive(Clone)]
pub struct CategoryService {
    api: Arc<dyn ForumApi>,
    cache: Arc<RwLock<HashMap<i64, Category>>>,
}

impl CategoryService {
    pub fn new(api: Arc<dyn ForumApi>) -> Self {
        Self {
            api,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// サーバからカテゴリ一覧を取り直す
    pub async fn load(&self) -> Result<Vec<Category>, AppError> {
        let categories = self.api.fetch_categories().await?;
        let mut cache = self.cache.write().await;
        cache.clear();
        for category in &categories {
            cache.insert(category.id, category.clone());
        }
        Ok(categories)
    }

    pub async fn lookup(&self, id: i64) -> Option<Category> {
        let cache = self.cache.read().await;
        cache.get(&id).cloned()
    }

    /// id 順のカテゴリ一覧（セレクタ表示向け）
    pub async fn all(&self) -> Vec<Category> {
        let cache = self.cache.read().await;
        let mut categories: Vec<Category> = cache.values().cloned().collect();
        categories.sort_by_key(|c| c.id);
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::api_gateway::MockForumApi;

    #[tokio::test]
    async fn load_then_lookup() {
        let mut api = MockForumApi::new();
        api.expect_fetch_categories().times(1).returning(|| {
            Ok(vec![
                Category {
                    id: 2,
                    name: "general".to_string(),
                },
                Category {
                    id: 1,
                    name: "news".to_string(),
                },
            ])
        });

        let service = CategoryService::new(Arc::new(api));
        service.load().await.expect("load categories");

        assert_eq!(service.lookup(2).await.unwrap().name, "general");
        assert!(service.lookup(99).await.is_none());

        let ids: Vec<i64> = service.all().await.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
