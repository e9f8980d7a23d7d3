use axum::{
    routing::{get, post},
    Router,
};
use jobboard_backend::services::alert_service::AlertService;
use jobboard_backend::services::mail_service::MailService;
use jobboard_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::auth,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool.clone());

    let alert_service = AlertService::new(
        pool.clone(),
        config.frontend_url.clone(),
        config.alert_batch_size,
    );
    let mailer = MailService::from_config(config)?;

    // Hourly tick (effective cadence for instant-frequency searches) and a
    // daily 09:00 tick driving daily/weekly searches. Both invoke the same
    // dispatch entry point; the frequency gate decides what actually fires.
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create scheduler: {e}"))?;
    for schedule in ["0 0 * * * *", "0 0 9 * * *"] {
        let svc = alert_service.clone();
        let mailer = mailer.clone();
        let job = CronJob::new_async(schedule, move |_id, _sched| {
            let svc = svc.clone();
            let mailer = mailer.clone();
            Box::pin(async move {
                match svc.run_once(&mailer).await {
                    Ok(summary) => {
                        tracing::debug!(sent = summary.sent, "job alert tick completed")
                    }
                    Err(e) => tracing::error!(error = ?e, "job alert run failed"),
                }
            })
        })
        .map_err(|e| anyhow::anyhow!("invalid alert schedule {schedule}: {e}"))?;
        scheduler
            .add(job)
            .await
            .map_err(|e| anyhow::anyhow!("failed to register alert schedule: {e}"))?;
    }
    scheduler
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start scheduler: {e}"))?;
    info!("Job alert schedules registered (hourly and daily)");

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let saved_search_api = Router::new()
        .route(
            "/api/saved-searches",
            get(routes::saved_search::list_saved_searches)
                .post(routes::saved_search::create_saved_search),
        )
        .route(
            "/api/saved-searches/:id",
            axum::routing::patch(routes::saved_search::update_saved_search)
                .delete(routes::saved_search::delete_saved_search),
        )
        .route(
            "/api/saved-searches/:id/jobs",
            get(routes::saved_search::get_matching_jobs),
        )
        .route_layer(axum::middleware::from_fn(auth::require_bearer_auth));

    let jobs_api = Router::new()
        .route(
            "/api/jobs",
            get(routes::jobs::list_jobs).merge(
                post(routes::jobs::create_job)
                    .layer(axum::middleware::from_fn(auth::require_employer_or_admin)),
            ),
        )
        .route("/api/jobs/:slug", get(routes::jobs::get_job));

    let app = base_routes
        .merge(saved_search_api)
        .merge(jobs_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
