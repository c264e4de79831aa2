use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::domain::search::{ParamsError, ScrapingResult, SearchParams, SourceKind};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search parameters: {0}")]
    InvalidParams(#[from] ParamsError),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SearchError {
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidParams(_) => "missingParams",
            SearchError::Upstream(_) => "upstreamError",
            SearchError::Internal(_) => "internalError",
        }
    }
}

/// One (query, location) search against a single data source. Transient upstream failures
/// come back as an `Ok` result carrying error notes, never as `Err`.
#[async_trait]
pub trait LeadSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn search(&self, params: SearchParams) -> Result<ScrapingResult, SearchError>;
}

/// Lead sources keyed by the kind of data they produce.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Arc<HashMap<SourceKind, Arc<dyn LeadSource>>>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<Arc<dyn LeadSource>>) -> Self {
        SourceRegistry {
            sources: Arc::new(sources.into_iter().map(|s| (s.kind(), s)).collect()),
        }
    }

    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn LeadSource>> {
        self.sources.get(&kind).cloned()
    }
}
