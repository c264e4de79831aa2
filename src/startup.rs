use std::{net::TcpListener, sync::Arc};

use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};

use crate::{
    routes::{batch_route, default_route, proxy_route, results_route, search_route},
    services::{BatchOrchestrator, ProxyPool, ResultCache, SourceRegistry},
};

/// Registers every route. Shared with the api tests so they exercise the same wiring.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(default_route::health_check)
        .service(search_route::search)
        .service(proxy_route::proxy_health)
        .service(
            web::scope("/batch")
                .service(batch_route::start_batch)
                .service(batch_route::batch_export)
                .service(batch_route::batch_status),
        )
        .service(web::scope("/results").service(results_route::cached_result));
}

pub fn run(
    listener: TcpListener,
    sources: SourceRegistry,
    orchestrator: BatchOrchestrator,
    proxy_pool: Arc<ProxyPool>,
    cache: Arc<dyn ResultCache>,
) -> Result<Server, std::io::Error> {
    let sources = Data::new(sources);
    let orchestrator = Data::new(orchestrator);
    let proxy_pool = Data::from(proxy_pool);
    let cache: Data<dyn ResultCache> = Data::from(cache);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(configure_routes)
            .app_data(sources.clone())
            .app_data(orchestrator.clone())
            .app_data(proxy_pool.clone())
            .app_data(cache.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
