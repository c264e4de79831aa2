use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::domain::{
    business::normalize_businesses,
    search::{ScrapingResult, SearchParams, SourceKind, SourceReport},
};

use super::{
    cache::{persist_best_effort, ResultCache},
    lead_source::{LeadSource, SearchError},
    result_parser::ResultParser,
    source_fetcher::{SourceFetcher, MAX_FETCH_TIMEOUT},
};

pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search";

#[derive(Debug, Clone, Copy, PartialEq)]
enum SearchStage {
    Created,
    Fetching,
    Parsing,
    Normalizing,
    Cached,
    Done,
    Failed,
}

fn enter(execution_id: Uuid, stage: SearchStage) {
    log::debug!("Search {} -> {:?}", execution_id, stage);
}

/// Scrapes the local results page for one (query, location) pair.
pub struct SearchExecutor {
    fetcher: SourceFetcher,
    parser: ResultParser,
    cache: Arc<dyn ResultCache>,
    search_url: Url,
    request_timeout: Duration,
}

impl SearchExecutor {
    pub fn new(
        fetcher: SourceFetcher,
        parser: ResultParser,
        cache: Arc<dyn ResultCache>,
        search_url: Url,
    ) -> Self {
        SearchExecutor {
            fetcher,
            parser,
            cache,
            search_url,
            request_timeout: MAX_FETCH_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout.min(MAX_FETCH_TIMEOUT);
        self
    }

    pub fn build_search_url(&self, params: &SearchParams) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair(
                "q",
                &format!("{} in {}", params.query.trim(), params.location.trim()),
            )
            .append_pair("tbm", "lcl")
            .append_pair("num", &params.max_results.to_string());
        url
    }

    pub async fn execute(&self, params: SearchParams) -> Result<ScrapingResult, SearchError> {
        let execution_id = Uuid::new_v4();
        enter(execution_id, SearchStage::Created);

        if let Err(e) = params.validate() {
            enter(execution_id, SearchStage::Failed);
            log::error!("Search {} rejected: {}", execution_id, e);
            return Err(e.into());
        }

        log::info!(
            "Search {} started for '{}' in '{}'",
            execution_id,
            params.query,
            params.location
        );

        enter(execution_id, SearchStage::Fetching);
        let target_url = self.build_search_url(&params);
        let lease = match params.use_proxies {
            true => {
                let lease = self.fetcher.pool().acquire();
                if lease.is_none() {
                    log::warn!(
                        "Search {}: no proxy available, falling back to a direct request",
                        execution_id
                    );
                }
                lease
            }
            false => None,
        };

        let page = match self
            .fetcher
            .fetch(&target_url, lease.as_ref(), self.request_timeout)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                let result = ScrapingResult::new(
                    execution_id,
                    &params,
                    vec![],
                    vec![SourceReport {
                        name: SourceKind::Scrape.to_string(),
                        count: 0,
                        success: false,
                    }],
                    vec![e.to_string()],
                    vec![],
                );
                return Ok(self.finish(result).await);
            }
        };

        enter(execution_id, SearchStage::Parsing);
        let parsed = self.parser.parse(&page.body, target_url.as_str());
        let parsed_count = parsed.businesses.len();

        enter(execution_id, SearchStage::Normalizing);
        let businesses = normalize_businesses(parsed.businesses, &params);
        log::info!(
            "Search {} parsed {} cards, kept {} businesses",
            execution_id,
            parsed_count,
            businesses.len()
        );

        let result = ScrapingResult::new(
            execution_id,
            &params,
            businesses,
            vec![SourceReport {
                name: SourceKind::Scrape.to_string(),
                count: parsed_count,
                success: true,
            }],
            vec![],
            parsed.warnings,
        );

        Ok(self.finish(result).await)
    }

    async fn finish(&self, result: ScrapingResult) -> ScrapingResult {
        if persist_best_effort(self.cache.as_ref(), SourceKind::Scrape, &result).await {
            enter(result.execution_id(), SearchStage::Cached);
        }
        enter(result.execution_id(), SearchStage::Done);
        result
    }
}

#[async_trait]
impl LeadSource for SearchExecutor {
    fn kind(&self) -> SourceKind {
        SourceKind::Scrape
    }

    async fn search(&self, params: SearchParams) -> Result<ScrapingResult, SearchError> {
        self.execute(params).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::{SearchExecutor, DEFAULT_SEARCH_URL};
    use crate::{
        domain::search::SearchParams,
        services::{
            cache::MemoryResultCache,
            proxy_pool::ProxyPool,
            result_parser::{CardLayout, ResultParser},
            source_fetcher::SourceFetcher,
        },
    };

    #[test]
    fn search_url_carries_query_and_location() {
        let executor = SearchExecutor::new(
            SourceFetcher::new(Arc::new(ProxyPool::empty())).unwrap(),
            ResultParser::new(&CardLayout::default()).unwrap(),
            Arc::new(MemoryResultCache::new()),
            Url::parse(DEFAULT_SEARCH_URL).unwrap(),
        );

        let url = executor.build_search_url(
            &SearchParams::new("move-out cleaning", "Miami, Florida").with_max_results(50),
        );

        assert_eq!(
            url.as_str(),
            "https://www.google.com/search?q=move-out+cleaning+in+Miami%2C+Florida&tbm=lcl&num=50"
        );
    }
}
