use std::{collections::HashMap, io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    dal::search_cache_db,
    domain::search::{ScrapingResult, SourceKind},
};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub fn cache_key(namespace: SourceKind, execution_id: Uuid) -> String {
    format!("{}:{}", namespace, execution_id)
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn put(
        &self,
        namespace: SourceKind,
        execution_id: Uuid,
        result: &ScrapingResult,
    ) -> Result<(), CacheError>;

    async fn get(
        &self,
        namespace: SourceKind,
        execution_id: Uuid,
    ) -> Result<Option<ScrapingResult>, CacheError>;
}

/// Writes the result and swallows any failure after logging it.
pub async fn persist_best_effort(
    cache: &dyn ResultCache,
    namespace: SourceKind,
    result: &ScrapingResult,
) -> bool {
    let execution_id = result.execution_id();
    match cache.put(namespace, execution_id, result).await {
        Ok(()) => {
            log::debug!("Cached {}", cache_key(namespace, execution_id));
            true
        }
        Err(e) => {
            log::error!(
                "Failed to cache {}: {:?}",
                cache_key(namespace, execution_id),
                e
            );
            false
        }
    }
}

/// One JSON document per result under `<directory>/<namespace>/<execution_id>.json`.
pub struct FileResultCache {
    directory: PathBuf,
}

impl FileResultCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        FileResultCache {
            directory: directory.into(),
        }
    }

    fn path(&self, namespace: SourceKind, execution_id: Uuid) -> PathBuf {
        self.directory
            .join(namespace.as_str())
            .join(format!("{}.json", execution_id))
    }
}

#[async_trait]
impl ResultCache for FileResultCache {
    async fn put(
        &self,
        namespace: SourceKind,
        execution_id: Uuid,
        result: &ScrapingResult,
    ) -> Result<(), CacheError> {
        let path = self.path(namespace, execution_id);
        let payload = serde_json::to_vec_pretty(result)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, payload).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        Ok(())
    }

    async fn get(
        &self,
        namespace: SourceKind,
        execution_id: Uuid,
    ) -> Result<Option<ScrapingResult>, CacheError> {
        match tokio::fs::read(self.path(namespace, execution_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps serialized documents in process memory.
#[derive(Default)]
pub struct MemoryResultCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn put(
        &self,
        namespace: SourceKind,
        execution_id: Uuid,
        result: &ScrapingResult,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(result)?;
        self.entries
            .write()
            .await
            .insert(cache_key(namespace, execution_id), payload);
        Ok(())
    }

    async fn get(
        &self,
        namespace: SourceKind,
        execution_id: Uuid,
    ) -> Result<Option<ScrapingResult>, CacheError> {
        match self
            .entries
            .read()
            .await
            .get(&cache_key(namespace, execution_id))
        {
            Some(payload) => Ok(Some(serde_json::from_str(payload)?)),
            None => Ok(None),
        }
    }
}

pub struct PgResultCache {
    pool: PgPool,
}

impl PgResultCache {
    pub fn new(pool: PgPool) -> Self {
        PgResultCache { pool }
    }
}

#[async_trait]
impl ResultCache for PgResultCache {
    async fn put(
        &self,
        namespace: SourceKind,
        execution_id: Uuid,
        result: &ScrapingResult,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_value(result)?;
        search_cache_db::upsert_search_result(&self.pool, namespace.as_str(), execution_id, payload)
            .await?;
        Ok(())
    }

    async fn get(
        &self,
        namespace: SourceKind,
        execution_id: Uuid,
    ) -> Result<Option<ScrapingResult>, CacheError> {
        let payload =
            search_cache_db::get_search_result(&self.pool, namespace.as_str(), execution_id)
                .await?;

        match payload {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::{cache_key, FileResultCache, MemoryResultCache, ResultCache};
    use crate::domain::{
        business::{BusinessRecord, ContactRecord},
        search::{ScrapingResult, SearchParams, SourceKind, SourceReport},
    };

    fn result() -> ScrapingResult {
        let mut business = BusinessRecord::new(
            "Sparkle Clean".to_string(),
            SourceKind::Scrape,
            "https://www.google.com/search?q=cleaning".to_string(),
        );
        business.phone_number = Some("(305) 555-0134".to_string());
        business.contacts = vec![ContactRecord::new(
            business.id,
            "Ana Diaz".to_string(),
            Some("Owner".to_string()),
            Some("ana@sparkleclean.com".to_string()),
            None,
        )];

        ScrapingResult::new(
            Uuid::new_v4(),
            &SearchParams::new("move-out cleaning", "Miami, Florida"),
            vec![business],
            vec![SourceReport {
                name: "scrape".to_string(),
                count: 1,
                success: true,
            }],
            vec![],
            vec!["Skipped card 3 has no business name".to_string()],
        )
    }

    #[test]
    fn keys_are_namespaced() {
        let id = Uuid::nil();
        assert_ne!(cache_key(SourceKind::Scrape, id), cache_key(SourceKind::Places, id));
    }

    #[tokio::test]
    async fn file_cache_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = FileResultCache::new(dir.path());
        let result = result();

        cache
            .put(SourceKind::Scrape, result.execution_id(), &result)
            .await
            .unwrap();

        let stored = cache
            .get(SourceKind::Scrape, result.execution_id())
            .await
            .unwrap();
        assert_eq!(stored, Some(result.clone()));

        let other_namespace = cache
            .get(SourceKind::Places, result.execution_id())
            .await
            .unwrap();
        assert_eq!(other_namespace, None);
    }

    #[tokio::test]
    async fn file_cache_missing_entry() {
        let dir = TempDir::new().unwrap();
        let cache = FileResultCache::new(dir.path());

        assert!(cache
            .get(SourceKind::Scrape, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn file_cache_write_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let cache = FileResultCache::new(&blocker);
        let result = result();

        assert!(cache
            .put(SourceKind::Scrape, result.execution_id(), &result)
            .await
            .is_err());
        assert!(!super::persist_best_effort(&cache, SourceKind::Scrape, &result).await);
    }

    #[tokio::test]
    async fn memory_cache_round_trip() {
        let cache = MemoryResultCache::new();
        let result = result();

        cache
            .put(SourceKind::Places, result.execution_id(), &result)
            .await
            .unwrap();

        assert_eq!(
            cache
                .get(SourceKind::Places, result.execution_id())
                .await
                .unwrap(),
            Some(result.clone())
        );
        assert_eq!(
            cache
                .get(SourceKind::Scrape, result.execution_id())
                .await
                .unwrap(),
            None
        );
        assert_eq!(cache.len().await, 1);
    }
}
