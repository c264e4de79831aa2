use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::{
        batch::{BatchOptions, BatchRequest, BatchStatus},
        search::SourceKind,
    },
    routes::ErrorResponse,
    services::{BatchError, BatchOrchestrator},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchBody {
    #[serde(default)]
    services: Vec<String>,
    #[serde(default)]
    locations: Vec<String>,
    max_results: Option<usize>,
    #[serde(default)]
    only_decision_makers: bool,
    use_proxies: Option<bool>,
    #[serde(default)]
    source: SourceKind,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchAccepted {
    batch_id: Uuid,
    status: BatchStatus,
    total_searches: usize,
    output_ref: String,
}

fn batch_error_response(e: BatchError) -> HttpResponse {
    match e {
        BatchError::EmptyInput | BatchError::ZeroMaxResults => {
            ErrorResponse::bad_request(e.to_string())
        }
        BatchError::SourceUnavailable(_) => ErrorResponse::internal(e.to_string()),
        BatchError::NotFound(_) => HttpResponse::NotFound().json(ErrorResponse {
            code: "notFound",
            message: e.to_string(),
        }),
        BatchError::NotFinished(_) => HttpResponse::Conflict().json(ErrorResponse {
            code: "notFinished",
            message: e.to_string(),
        }),
    }
}

#[post("")]
async fn start_batch(
    orchestrator: web::Data<BatchOrchestrator>,
    body: web::Json<BatchBody>,
) -> HttpResponse {
    let body = body.into_inner();
    let request = BatchRequest {
        services: body.services,
        locations: body.locations,
        max_results: body.max_results,
        options: BatchOptions {
            only_decision_makers: body.only_decision_makers,
            use_proxies: body.use_proxies.unwrap_or(true),
            source: body.source,
        },
    };

    match orchestrator.run_batch(request).await {
        Ok(job) => HttpResponse::Accepted().json(BatchAccepted {
            batch_id: job.batch_id,
            status: job.status,
            total_searches: job.total_searches,
            output_ref: job.output_ref,
        }),
        Err(e) => batch_error_response(e),
    }
}

#[get("/{batch_id}")]
async fn batch_status(
    orchestrator: web::Data<BatchOrchestrator>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    match orchestrator.batch_status(path.into_inner()).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => batch_error_response(e),
    }
}

#[get("/{batch_id}/export")]
async fn batch_export(
    orchestrator: web::Data<BatchOrchestrator>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    match orchestrator.export(path.into_inner()).await {
        Ok(export) => HttpResponse::Ok().json(export),
        Err(e) => batch_error_response(e),
    }
}
