pub mod batch_route;
pub mod default_route;
pub mod proxy_route;
pub mod results_route;
pub mod search_route;

use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: String) -> HttpResponse {
        HttpResponse::BadRequest().json(ErrorResponse {
            code: "missingParams",
            message,
        })
    }

    pub fn internal(message: String) -> HttpResponse {
        HttpResponse::InternalServerError().json(ErrorResponse {
            code: "internalError",
            message,
        })
    }
}
