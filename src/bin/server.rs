use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use cutlist_optimizer::types::{BarOptimizationResult, LengthSearchResult, PanelOptimizationResult};
use cutlist_optimizer::{BarJob, LengthSearchJob, OptimizerConfig, PanelJob};
use serde::Serialize;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Runs `work` off the async runtime. Validation failures map to 400.
async fn run_blocking<J, T>(
    config: Arc<OptimizerConfig>,
    job: J,
    work: fn(&J, &OptimizerConfig) -> cutlist_optimizer::Result<T>,
) -> ApiResult<T>
where
    J: Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&job, &config))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "optimization task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "optimization failed".to_string())
        })?
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn log_body<B: Serialize>(route: &str, body: &B) {
    tracing::info!(body = serde_json::to_string(body).unwrap_or_default(), "POST {route}");
}

async fn optimize_bars(
    State(config): State<Arc<OptimizerConfig>>,
    Json(job): Json<BarJob>,
) -> ApiResult<BarOptimizationResult> {
    log_body("/optimize/bars", &job);
    run_blocking(config, job, BarJob::run).await
}

async fn optimize_panels(
    State(config): State<Arc<OptimizerConfig>>,
    Json(job): Json<PanelJob>,
) -> ApiResult<PanelOptimizationResult> {
    log_body("/optimize/panels", &job);
    run_blocking(config, job, PanelJob::run).await
}

async fn search_bar_length(
    State(config): State<Arc<OptimizerConfig>>,
    Json(job): Json<LengthSearchJob>,
) -> ApiResult<LengthSearchResult> {
    log_body("/search/bar-length", &job);
    run_blocking(config, job, LengthSearchJob::run).await
}

fn load_config() -> Result<OptimizerConfig, cutlist_optimizer::OptimizerError> {
    match std::env::var_os("CUTLIST_CONFIG") {
        Some(path) => OptimizerConfig::from_json_file(Path::new(&path)),
        None => Ok(OptimizerConfig::default()),
    }
}

fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime")
        .block_on(serve(config));
}

async fn serve(config: OptimizerConfig) {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize/bars", post(optimize_bars))
        .route("/optimize/panels", post(optimize_panels))
        .route("/search/bar-length", post(search_bar_length))
        .with_state(Arc::new(config))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
