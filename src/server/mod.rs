//! HTTP transport (spec §6): one axum [`Router`] under `/api/v1`, guarded
//! by constant-time API-key auth, plus an unauthenticated `/health` probe.
//! Router/CORS assembly is grounded in the teacher's `HttpTransportConfig`/
//! `HttpTransport::router`; the auth layer in its `auth_middleware`.

pub mod auth;
pub mod envelope;
pub mod handlers;

use crate::service::VikingService;
use auth::{auth_middleware, AuthState};
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub enable_cors: bool,
}

impl ServerOptions {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], self.port)))
    }
}

/// Builds the full application router: `/health` is unauthenticated, every
/// `/api/v1/*` route sits behind [`auth_middleware`].
pub fn router(service: Arc<VikingService>, options: &ServerOptions) -> Router {
    let auth_state = AuthState { api_key: options.api_key.clone().map(Into::into) };

    let api = Router::new()
        .route("/system/status", get(handlers::observer::system))
        .route("/system/wait", post(wait_handler))
        .route("/resources", post(handlers::resources::add_resource))
        .route("/skills", post(handlers::skills::add_skill))
        .route("/fs/ls", get(handlers::fs::ls))
        .route("/fs/tree", get(handlers::fs::tree))
        .route("/fs/stat", get(handlers::fs::stat))
        .route("/fs/mkdir", post(handlers::fs::mkdir))
        .route("/fs", delete(handlers::fs::rm))
        .route("/fs/mv", post(handlers::fs::mv))
        .route("/content/read", get(handlers::content::read))
        .route("/content/abstract", get(handlers::content::read_abstract))
        .route("/content/overview", get(handlers::content::read_overview))
        .route("/search/find", post(handlers::search::find))
        .route("/search/search", post(handlers::search::search))
        .route("/search/grep", post(handlers::search::grep))
        .route("/search/glob", post(handlers::search::glob))
        .route("/relations", get(handlers::relations::get))
        .route("/relations/link", post(handlers::relations::link).delete(handlers::relations::unlink))
        .route("/sessions", post(handlers::sessions::create).get(handlers::sessions::list))
        .route("/sessions/{id}", get(handlers::sessions::get).delete(handlers::sessions::delete))
        .route("/sessions/{id}/commit", post(handlers::sessions::commit))
        .route("/sessions/{id}/extract", post(handlers::sessions::extract))
        .route("/sessions/{id}/messages", post(handlers::sessions::append_message))
        .route("/pack/export", post(handlers::pack::export))
        .route("/pack/import", post(handlers::pack::import))
        .route("/observer/queue", get(handlers::observer::queue))
        .route("/observer/vikingdb", get(handlers::observer::vikingdb))
        .route("/observer/vlm", get(handlers::observer::vlm))
        .route("/observer/transaction", get(handlers::observer::transaction))
        .route("/observer/system", get(handlers::observer::system))
        .route("/debug/health", get(handlers::debug::debug_health))
        .layer(axum::middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(service);

    let mut router = Router::new().route("/health", get(handlers::debug::health)).nest("/api/v1", api).layer(TraceLayer::new_for_http());

    if options.enable_cors {
        router = router.layer(
            CorsLayer::new().allow_origin(Any).allow_methods([Method::GET, Method::POST, Method::DELETE]).allow_headers(Any),
        );
    }
    router
}

#[derive(Debug, serde::Deserialize)]
struct WaitRequest {
    #[serde(default)]
    timeout: Option<u64>,
}

async fn wait_handler(
    axum::extract::State(service): axum::extract::State<Arc<VikingService>>,
    axum::Json(req): axum::Json<WaitRequest>,
) -> envelope::ApiResult<()> {
    handlers::resources::wait_with_timeout(&service, req.timeout).await?;
    Ok(envelope::ok(()))
}

/// Runs the server until the given shutdown signal resolves.
pub async fn serve(service: Arc<VikingService>, options: ServerOptions, shutdown: impl std::future::Future<Output = ()> + Send + 'static) -> std::io::Result<()> {
    let addr = options.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http server listening");
    let app = router(service, &options);
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}
