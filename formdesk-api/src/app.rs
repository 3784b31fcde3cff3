/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use formdesk_api::{app::{build_router, AppState}, config::Config};
/// use formdesk_core::provider::MemoryDocumentProvider;
/// use formdesk_core::services::Services;
/// use formdesk_core::store::MemoryRowStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let services = Services::new(
///     Arc::new(MemoryRowStore::new()),
///     Arc::new(MemoryDocumentProvider::new()),
///     config.service_config(),
/// );
/// let app = build_router(AppState::new(services, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use crate::middleware::auth::{admin_auth_layer, session_auth_layer};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use formdesk_core::services::Services;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Core services over the configured store
    pub services: Services,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(services: Services, config: Config) -> Self {
        Self {
            services,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health
/// └── /v1/
///     ├── POST /users                        register
///     ├── /auth/
///     │   ├── POST /login                    access ID + password
///     │   ├── POST /session                  session token
///     │   ├── POST /remember                 remember token
///     │   ├── POST /remember/issue           (Bearer session)
///     │   └── POST /remember/invalidate      (Bearer session)
///     ├── GET  /templates
///     ├── POST /templates                    (admin token)
///     ├── GET  /instances                    (Bearer session)
///     ├── POST /instances                    (Bearer session)
///     └── POST /admin/setup                  (admin token)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let user_routes = Router::new().route("/", post(routes::users::register));

    let remember_routes = Router::new()
        .route("/remember/issue", post(routes::auth::issue_remember_token))
        .route("/remember/invalidate", post(routes::auth::invalidate_remember_token))
        .route_layer(from_fn(session_auth_layer));

    let auth_routes = Router::new()
        .route("/login", post(routes::auth::login))
        .route("/session", post(routes::auth::session_login))
        .route("/remember", post(routes::auth::remember_login))
        .merge(remember_routes);

    let template_routes = Router::new().route(
        "/",
        get(routes::templates::list_templates).merge(
            post(routes::templates::register_template)
                .route_layer(from_fn_with_state(state.clone(), admin_auth_layer)),
        ),
    );

    let instance_routes = Router::new()
        .route(
            "/",
            get(routes::instances::list_instances).post(routes::instances::provision_instance),
        )
        .route_layer(from_fn(session_auth_layer));

    let admin_routes = Router::new()
        .route("/setup", post(routes::admin::setup))
        .route_layer(from_fn_with_state(state.clone(), admin_auth_layer));

    let v1_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/auth", auth_routes)
        .nest("/templates", template_routes)
        .nest("/instances", instance_routes)
        .nest("/admin", admin_routes);

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
