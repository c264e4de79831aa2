use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::{
    domain::search::{SearchParams, SourceKind, DEFAULT_MAX_RESULTS},
    routes::ErrorResponse,
    services::{SearchError, SourceRegistry},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuery {
    query: Option<String>,
    location: Option<String>,
    #[serde(alias = "max_results")]
    max_results: Option<usize>,
    #[serde(alias = "only_decision_makers")]
    only_decision_makers: Option<bool>,
    #[serde(alias = "use_proxies")]
    use_proxies: Option<bool>,
    source: Option<String>,
}

#[get("/search")]
async fn search(sources: web::Data<SourceRegistry>, query: web::Query<SearchQuery>) -> HttpResponse {
    let query = query.into_inner();

    let kind = match query.source.as_deref() {
        None => SourceKind::Scrape,
        Some(source) => match SourceKind::parse(source) {
            Some(kind) => kind,
            None => {
                return ErrorResponse::bad_request(format!("Unknown source '{}'", source));
            }
        },
    };
    let Some(lead_source) = sources.get(kind) else {
        return ErrorResponse::internal(format!("No lead source configured for '{}'", kind));
    };

    let params = SearchParams::new(
        query.query.unwrap_or_default(),
        query.location.unwrap_or_default(),
    )
    .with_max_results(query.max_results.unwrap_or(DEFAULT_MAX_RESULTS))
    .with_only_decision_makers(query.only_decision_makers.unwrap_or(false))
    .with_proxies(query.use_proxies.unwrap_or(true));

    match lead_source.search(params).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => search_error_response(e),
    }
}

pub fn search_error_response(e: SearchError) -> HttpResponse {
    let body = ErrorResponse {
        code: e.code(),
        message: e.to_string(),
    };

    match e {
        SearchError::InvalidParams(_) => HttpResponse::BadRequest().json(body),
        SearchError::Upstream(_) => HttpResponse::BadGateway().json(body),
        SearchError::Internal(_) => HttpResponse::InternalServerError().json(body),
    }
}
