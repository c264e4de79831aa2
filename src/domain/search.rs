use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::business::BusinessRecord;

pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Which fetch path produced a record. Doubles as the cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Scrape,
    Places,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Scrape => "scrape",
            SourceKind::Places => "places",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "scrape" => Some(SourceKind::Scrape),
            "places" => Some(SourceKind::Places),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamsError {
    #[error("missing required parameter: {0}")]
    Missing(&'static str),
    #[error("maxResults must be at least 1")]
    ZeroMaxResults,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub location: String,
    pub max_results: usize,
    pub only_decision_makers: bool,
    pub use_proxies: bool,
}

impl SearchParams {
    pub fn new(query: impl Into<String>, location: impl Into<String>) -> Self {
        SearchParams {
            query: query.into(),
            location: location.into(),
            max_results: DEFAULT_MAX_RESULTS,
            only_decision_makers: false,
            use_proxies: true,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_only_decision_makers(mut self, only_decision_makers: bool) -> Self {
        self.only_decision_makers = only_decision_makers;
        self
    }

    pub fn with_proxies(mut self, use_proxies: bool) -> Self {
        self.use_proxies = use_proxies;
        self
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.query.trim().is_empty() {
            return Err(ParamsError::Missing("query"));
        }
        if self.location.trim().is_empty() {
            return Err(ParamsError::Missing("location"));
        }
        if self.max_results == 0 {
            return Err(ParamsError::ZeroMaxResults);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub name: String,
    pub count: usize,
    pub success: bool,
}

/// Outcome of one search attempt. Counts are always derived from the sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScrapingResultDocument", into = "ScrapingResultDocument")]
pub struct ScrapingResult {
    execution_id: Uuid,
    query: String,
    location: String,
    timestamp: DateTime<Utc>,
    businesses: Vec<BusinessRecord>,
    business_count: usize,
    contact_count: usize,
    sources: Vec<SourceReport>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ScrapingResult {
    pub fn new(
        execution_id: Uuid,
        params: &SearchParams,
        businesses: Vec<BusinessRecord>,
        sources: Vec<SourceReport>,
        errors: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self::assemble(
            execution_id,
            params.query.clone(),
            params.location.clone(),
            Utc::now(),
            businesses,
            sources,
            errors,
            warnings,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        execution_id: Uuid,
        query: String,
        location: String,
        timestamp: DateTime<Utc>,
        businesses: Vec<BusinessRecord>,
        sources: Vec<SourceReport>,
        errors: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        let business_count = businesses.len();
        let contact_count = businesses.iter().map(|b| b.contacts.len()).sum();

        ScrapingResult {
            execution_id,
            query,
            location,
            timestamp,
            businesses,
            business_count,
            contact_count,
            sources,
            errors,
            warnings,
        }
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn businesses(&self) -> &[BusinessRecord] {
        &self.businesses
    }

    pub fn business_count(&self) -> usize {
        self.business_count
    }

    pub fn contact_count(&self) -> usize {
        self.contact_count
    }

    pub fn sources(&self) -> &[SourceReport] {
        &self.sources
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapingResultDocument {
    execution_id: Uuid,
    query: String,
    location: String,
    timestamp: DateTime<Utc>,
    businesses: Vec<BusinessRecord>,
    #[serde(default)]
    business_count: usize,
    #[serde(default)]
    contact_count: usize,
    #[serde(default)]
    sources: Vec<SourceReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

impl From<ScrapingResultDocument> for ScrapingResult {
    fn from(doc: ScrapingResultDocument) -> Self {
        // Stored counts are ignored
        ScrapingResult::assemble(
            doc.execution_id,
            doc.query,
            doc.location,
            doc.timestamp,
            doc.businesses,
            doc.sources,
            doc.errors,
            doc.warnings,
        )
    }
}

impl From<ScrapingResult> for ScrapingResultDocument {
    fn from(result: ScrapingResult) -> Self {
        ScrapingResultDocument {
            execution_id: result.execution_id,
            query: result.query,
            location: result.location,
            timestamp: result.timestamp,
            businesses: result.businesses,
            business_count: result.business_count,
            contact_count: result.contact_count,
            sources: result.sources,
            errors: result.errors,
            warnings: result.warnings,
        }
    }
}
