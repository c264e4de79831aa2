use actix_web::{get, web, HttpResponse};

use crate::services::ProxyPool;

#[get("/proxies")]
async fn proxy_health(pool: web::Data<ProxyPool>) -> HttpResponse {
    HttpResponse::Ok().json(pool.snapshot())
}
