use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use manga_edge_proxy::app_state::AppState;
use manga_edge_proxy::cache::AssetCache;
use manga_edge_proxy::catalog::HttpCatalog;
use manga_edge_proxy::checkpoint::FileCheckpointStore;
use manga_edge_proxy::config::Config;
use manga_edge_proxy::metrics::MetricsTracker;
use manga_edge_proxy::origin::{page_url_variants, HttpOrigin, Origin};
use manga_edge_proxy::proxy;
use manga_edge_proxy::signature;
use manga_edge_proxy::warmer::{self, Warmer};
use tokio_util::task::TaskTracker;

/// GET /{manga}/{chapter}/{file}?sig={hex}&t={unixSeconds}
///
/// Signature-gated page proxy. Any verification failure is a uniform 403
/// with no detail about why.
async fn serve_page(
    path: web::Path<(String, String, String)>,
    query: web::Query<HashMap<String, String>>,
    data: web::Data<AppState>,
) -> impl Responder {
    let (manga, chapter, file) = path.into_inner();
    let request_path = format!("/{}/{}/{}", manga, chapter, file);
    let cfg = &data.config.proxy;

    if !signature::verify(
        &request_path,
        query.get("t").map(String::as_str),
        query.get("sig").map(String::as_str),
        &cfg.secret,
    ) {
        data.metrics.record_failure("proxy", "forbidden");
        return HttpResponse::Forbidden()
            .content_type("text/plain")
            .body("Forbidden");
    }

    let variants = page_url_variants(cfg, &manga, &chapter, &file);
    match proxy::serve_asset(
        &data.cache,
        data.origin.as_ref(),
        &data.cache_writes,
        cfg,
        &variants,
    )
    .await
    {
        Some(response) => {
            data.metrics.record_success("proxy");
            match response.cache_status {
                proxy::CacheStatus::Hit => data.metrics.record_cache_hit("proxy"),
                proxy::CacheStatus::Miss => data.metrics.record_cache_miss("proxy"),
            }
            let mut builder = HttpResponse::Ok();
            builder
                .insert_header(("X-Proxy-Cache", response.cache_status.as_str()))
                .insert_header(("Access-Control-Allow-Origin", "*"))
                .insert_header((
                    "Cache-Control",
                    format!("public, max-age={}, immutable", cfg.cache_ttl_secs),
                ));
            if let Some(ct) = &response.asset.content_type {
                builder.content_type(ct.as_str());
            }
            builder.body(response.asset.body.clone())
        }
        None => {
            data.metrics.record_failure("proxy", "no origin variant succeeded");
            HttpResponse::NotFound()
                .content_type("text/plain")
                .body("Not Found")
        }
    }
}

/// Plain-text status, served for any path with fewer than three segments
async fn status(data: web::Data<AppState>) -> impl Responder {
    let progress = data.warmer.progress();
    let checkpoint = data.warmer.checkpoint();
    let body = format!(
        "manga-edge-proxy online\n\
         warm pass in progress: {}\n\
         current manga: {}\n\
         pages warmed: {}\n\
         passes completed: {}\n\
         checkpoint: manga {} chapter {} page {}\n\
         last error: {}\n",
        progress.in_progress,
        progress.current_manga.as_deref().unwrap_or("-"),
        progress.pages_warmed,
        progress.passes_completed,
        checkpoint.manga_idx,
        checkpoint.chapter_idx,
        checkpoint.page_idx,
        progress.last_error.as_deref().unwrap_or("-"),
    );
    HttpResponse::Ok().content_type("text/plain").body(body)
}

async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(data.metrics.export_json())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    log4rs::init_file("log4rs.yml", Default::default()).unwrap();

    let cfg = Config::load();

    let client = reqwest::Client::builder()
        .user_agent(cfg.proxy.user_agent.clone())
        .timeout(Duration::from_secs(30))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .unwrap();

    let cache = AssetCache::new(
        cfg.proxy.max_cached_bytes,
        Duration::from_secs(cfg.proxy.cache_ttl_secs),
    );
    let origin: Arc<dyn Origin> = Arc::new(HttpOrigin::new(client.clone(), &cfg.proxy));
    let metrics = MetricsTracker::new();

    let warmer = Arc::new(Warmer::new(
        origin.clone(),
        Arc::new(HttpCatalog::new(client.clone(), &cfg.warmer)),
        Arc::new(FileCheckpointStore::new(cfg.warmer.checkpoint_path.clone())),
        cfg.proxy.clone(),
        cfg.warmer.clone(),
        metrics.clone(),
    ));

    let cache_writes = TaskTracker::new();
    let data = web::Data::new(AppState {
        config: cfg.clone(),
        cache,
        origin,
        metrics,
        warmer: warmer.clone(),
        cache_writes: cache_writes.clone(),
    });

    if cfg.warmer.enabled {
        info!(
            "warm job enabled: batch size {}, budget {}s, interval {}s",
            cfg.warmer.batch_size, cfg.warmer.time_budget_secs, cfg.warmer.interval_secs
        );
        warmer::spawn(warmer.clone());
    }

    // Try to bind to an available port in the configured range
    let mut last_err: Option<std::io::Error> = None;
    for port in cfg.server.port_start..=cfg.server.port_end {
        let data_clone = data.clone();
        let addr = format!("{}:{}", cfg.server.bind_host, port);
        match HttpServer::new(move || {
            App::new()
                .app_data(data_clone.clone())
                .route("/", web::get().to(status))
                .route("/metrics", web::get().to(get_metrics))
                .route("/{manga}", web::get().to(status))
                .route("/{manga}/{chapter}", web::get().to(status))
                .route("/{manga}/{chapter}/{file}", web::get().to(serve_page))
        })
        .bind(&addr)
        {
            Ok(server) => {
                info!("Listening on {}", addr);
                let result = server.run().await;
                // In-flight cache writes must land before the process exits
                cache_writes.close();
                cache_writes.wait().await;
                return result;
            }
            Err(e) => {
                last_err = Some(e);
                continue;
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::AddrInUse, "No available ports")
    }))
}
