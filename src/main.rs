use std::{net::TcpListener, sync::Arc, time::Duration};

use anyhow::Context;
use env_logger::Env;
use prospector::{
    configuration::{get_configuration, CacheBackend, Settings},
    services::{
        BatchExporter, BatchOrchestrator, CardLayout, FileResultCache, LeadSource,
        MemoryResultCache, Pacing, PgResultCache, PlacesClient, ProxyPool, ResultCache,
        ResultParser, SearchExecutor, SourceFetcher, SourceRegistry,
    },
    startup::run,
};
use sqlx::postgres::PgPoolOptions;
use url::Url;

async fn build_cache(configuration: &Settings) -> anyhow::Result<Arc<dyn ResultCache>> {
    let cache: Arc<dyn ResultCache> = match configuration.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryResultCache::new()),
        CacheBackend::File => Arc::new(FileResultCache::new(&configuration.cache.directory)),
        CacheBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(15 * 60)) // 15 minutes
                .connect_lazy_with(configuration.database.with_db());
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            Arc::new(PgResultCache::new(pool))
        }
    };
    log::info!("Caching results in {:?} backend", configuration.cache.backend);
    Ok(cache)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().context("Failed to read configuration.")?;

    let proxy_pool = Arc::new(
        ProxyPool::load_from_configuration(
            &configuration.scraper.proxies,
            configuration.scraper.require_proxies,
        )?
        .with_block_threshold(configuration.scraper.block_threshold),
    );
    let cache = build_cache(&configuration).await?;

    let executor = SearchExecutor::new(
        SourceFetcher::new(proxy_pool.clone())?
            .with_block_markers(configuration.scraper.block_markers.clone()),
        ResultParser::new(&CardLayout::default())?,
        cache.clone(),
        Url::parse(&configuration.scraper.search_url).context("Invalid scraper.search_url")?,
    )
    .with_request_timeout(configuration.scraper.request_timeout());

    let mut sources: Vec<Arc<dyn LeadSource>> = vec![Arc::new(executor)];
    match configuration.places.api_key.clone() {
        Some(api_key) if !api_key.is_empty() => {
            let places = PlacesClient::new(
                api_key,
                Url::parse(&configuration.places.base_url).context("Invalid places.base_url")?,
                cache.clone(),
                configuration.scraper.request_timeout(),
            )?
            .with_details(configuration.places.fetch_details);
            sources.push(Arc::new(places));
        }
        _ => log::info!("No places api key configured, places source disabled"),
    }
    let sources = SourceRegistry::new(sources);

    let orchestrator = BatchOrchestrator::new(
        sources.clone(),
        BatchExporter::new(&configuration.scraper.export_directory),
        Pacing::new(
            configuration.scraper.pacing_min_ms,
            configuration.scraper.pacing_max_ms,
        ),
    )
    .with_retention(configuration.scraper.retained_batches);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    log::info!("Listening on {}", address);

    run(listener, sources, orchestrator, proxy_pool, cache)?.await?;
    Ok(())
}
