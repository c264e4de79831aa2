use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::domain::{
    business::{normalize_businesses, recognized_phone, BusinessRecord},
    search::{ScrapingResult, SearchParams, SourceKind, SourceReport},
};

use super::{
    cache::{persist_best_effort, ResultCache},
    lead_source::{LeadSource, SearchError},
    source_fetcher::MAX_FETCH_TIMEOUT,
};

pub const DEFAULT_PLACES_URL: &str = "https://maps.googleapis.com/maps/api/place/";

#[derive(Serialize)]
struct TextSearchQuery<'a> {
    query: String,
    key: &'a str,
}

#[derive(Serialize)]
struct DetailsQuery<'a> {
    place_id: &'a str,
    fields: &'static str,
    key: &'a str,
}

#[derive(Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceSummary>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct PlaceSummary {
    place_id: Option<String>,
    name: Option<String>,
    formatted_address: Option<String>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<PlaceDetails>,
}

#[derive(Deserialize)]
struct PlaceDetails {
    formatted_phone_number: Option<String>,
    website: Option<String>,
}

/// Looks businesses up through the Places Text Search API instead of scraping.
pub struct PlacesClient {
    client: Client,
    api_key: String,
    base_url: Url,
    cache: Arc<dyn ResultCache>,
    fetch_details: bool,
}

impl PlacesClient {
    pub fn new(
        api_key: String,
        base_url: Url,
        cache: Arc<dyn ResultCache>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(timeout.min(MAX_FETCH_TIMEOUT))
            .build()
            .map_err(|e| SearchError::Internal(e.to_string()))?;

        Ok(PlacesClient {
            client,
            api_key,
            base_url,
            cache,
            fetch_details: true,
        })
    }

    pub fn with_details(mut self, fetch_details: bool) -> Self {
        self.fetch_details = fetch_details;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, SearchError> {
        self.base_url
            .join(path)
            .map_err(|e| SearchError::Internal(format!("Invalid places url: {}", e)))
    }

    async fn text_search(
        &self,
        url: Url,
        params: &SearchParams,
    ) -> Result<TextSearchResponse, reqwest::Error> {
        self.client
            .get(url)
            .query(&TextSearchQuery {
                query: format!("{} in {}", params.query.trim(), params.location.trim()),
                key: &self.api_key,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<TextSearchResponse>()
            .await
    }

    async fn details(&self, place_id: &str) -> Result<Option<PlaceDetails>, String> {
        let url = self.endpoint("details/json").map_err(|e| e.to_string())?;
        let response = self
            .client
            .get(url)
            .query(&DetailsQuery {
                place_id,
                fields: "formatted_phone_number,website",
                key: &self.api_key,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.without_url().to_string())?
            .json::<DetailsResponse>()
            .await
            .map_err(|e| e.without_url().to_string())?;

        match response.status.as_str() {
            "OK" => Ok(response.result),
            status => Err(format!("details status {}", status)),
        }
    }

    // Same as the request url minus the api key
    fn source_url(mut url: Url, params: &SearchParams) -> String {
        url.query_pairs_mut().append_pair(
            "query",
            &format!("{} in {}", params.query.trim(), params.location.trim()),
        );
        url.to_string()
    }

    pub async fn execute(&self, params: SearchParams) -> Result<ScrapingResult, SearchError> {
        params.validate()?;
        let execution_id = Uuid::new_v4();
        log::info!(
            "Places search {} started for '{}' in '{}'",
            execution_id,
            params.query,
            params.location
        );

        let url = self.endpoint("textsearch/json")?;
        let response = match self.text_search(url.clone(), &params).await {
            Ok(response) => response,
            Err(e) => {
                // The request url carries the api key
                let e = e.without_url();
                log::error!("Places search {} failed: {:?}", execution_id, e);
                return Ok(self
                    .failed_result(execution_id, &params, format!("Places API request failed: {}", e))
                    .await);
            }
        };

        match response.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            "REQUEST_DENIED" | "INVALID_REQUEST" => {
                let message = response.error_message.unwrap_or(response.status);
                log::error!("Places search {} rejected: {}", execution_id, message);
                return Err(SearchError::Upstream(message));
            }
            status => {
                let message = format!(
                    "Places API returned {}{}",
                    status,
                    response
                        .error_message
                        .map(|m| format!(": {}", m))
                        .unwrap_or_default()
                );
                return Ok(self.failed_result(execution_id, &params, message).await);
            }
        }

        let source_url = Self::source_url(url, &params);
        let mut warnings = vec![];
        let mut businesses = vec![];
        let total = response.results.len();

        for place in response.results {
            let Some(name) = place.name.filter(|n| !n.trim().is_empty()) else {
                warnings.push("Skipped place without a name".to_string());
                continue;
            };

            let mut business = BusinessRecord::new(name, SourceKind::Places, source_url.clone());
            business.address = place.formatted_address;
            business.category = place
                .types
                .first()
                .map(|t| t.replace('_', " "));

            if self.fetch_details && businesses.len() < params.max_results {
                if let Some(place_id) = place.place_id.as_deref() {
                    match self.details(place_id).await {
                        Ok(Some(details)) => {
                            business.phone_number = details
                                .formatted_phone_number
                                .as_deref()
                                .and_then(recognized_phone);
                            business.website = details.website;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            log::warn!("Places details for {} failed: {}", place_id, e);
                            warnings.push(format!("Details unavailable for {}: {}", business.name, e));
                        }
                    }
                }
            }

            businesses.push(business);
        }

        let businesses = normalize_businesses(businesses, &params);
        let result = ScrapingResult::new(
            execution_id,
            &params,
            businesses,
            vec![SourceReport {
                name: SourceKind::Places.to_string(),
                count: total,
                success: true,
            }],
            vec![],
            warnings,
        );

        persist_best_effort(self.cache.as_ref(), SourceKind::Places, &result).await;
        Ok(result)
    }

    async fn failed_result(
        &self,
        execution_id: Uuid,
        params: &SearchParams,
        error: String,
    ) -> ScrapingResult {
        let result = ScrapingResult::new(
            execution_id,
            params,
            vec![],
            vec![SourceReport {
                name: SourceKind::Places.to_string(),
                count: 0,
                success: false,
            }],
            vec![error],
            vec![],
        );
        persist_best_effort(self.cache.as_ref(), SourceKind::Places, &result).await;
        result
    }
}

#[async_trait]
impl LeadSource for PlacesClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Places
    }

    async fn search(&self, params: SearchParams) -> Result<ScrapingResult, SearchError> {
        self.execute(params).await
    }
}
