use actix_web::{get, web, HttpResponse};
use uuid::Uuid;

use crate::{
    domain::search::SourceKind,
    routes::ErrorResponse,
    services::{cache_key, ResultCache},
};

#[get("/{namespace}/{execution_id}")]
async fn cached_result(
    cache: web::Data<dyn ResultCache>,
    path: web::Path<(String, Uuid)>,
) -> HttpResponse {
    let (namespace, execution_id) = path.into_inner();
    let Some(namespace) = SourceKind::parse(&namespace) else {
        return HttpResponse::NotFound().json(ErrorResponse {
            code: "unknownNamespace",
            message: format!("Unknown namespace '{}'", namespace),
        });
    };

    match cache.get(namespace, execution_id).await {
        Ok(Some(result)) => HttpResponse::Ok().json(result),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse {
            code: "notFound",
            message: format!("No cached result for {}", cache_key(namespace, execution_id)),
        }),
        Err(e) => {
            log::error!("Cache read for {} failed: {:?}", cache_key(namespace, execution_id), e);
            ErrorResponse::internal("Failed to read cached result".to_string())
        }
    }
}
