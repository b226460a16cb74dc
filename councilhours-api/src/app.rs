/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use councilhours_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = councilhours_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{request_context::request_context, security::SecurityHeadersLayer},
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use councilhours_shared::{
    access_code::AccessCodeAllocator,
    auth::middleware::{authenticate, AuthContext},
    store::PgMemberStore,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler; the config sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.session.secret
    }

    /// Allocator over the Postgres member store with the configured policy
    pub fn allocator(&self) -> AccessCodeAllocator<PgMemberStore> {
        AccessCodeAllocator::new(PgMemberStore::new(self.db.clone())).with_policy(
            self.config.access_code.length,
            self.config.access_code.max_attempts,
        )
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET  /health
/// └── /v1/
///     ├── POST /auth/login
///     ├── POST /auth/logout
///     ├── GET  /catalog
///     ├── GET  /dashboard                          (member)
///     ├── GET|PUT /activities                      (member)
///     ├── POST /activities/autosave                (member)
///     └── /admin/                                  (admin)
///         ├── GET    /report
///         ├── POST   /roster                       (open while no admin exists)
///         ├── POST   /members/:member_number/notify
///         ├── POST   /members/:member_number/access-code
///         ├── POST   /members/:member_number/promote
///         └── DELETE /members/:member_number
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/catalog", get(routes::catalog::get_catalog));

    let member_routes = Router::new()
        .route("/dashboard", get(routes::dashboard::get_dashboard))
        .route(
            "/activities",
            get(routes::activities::list_activities).put(routes::activities::save_activities),
        )
        .route("/activities/autosave", post(routes::activities::autosave))
        .route("/admin/report", get(routes::admin::report))
        .route(
            "/admin/members/:member_number/notify",
            post(routes::admin::notify_member),
        )
        .route(
            "/admin/members/:member_number/access-code",
            post(routes::admin::reset_access_code),
        )
        .route(
            "/admin/members/:member_number/promote",
            post(routes::admin::promote_member),
        )
        .route(
            "/admin/members/:member_number",
            delete(routes::admin::remove_member),
        )
        .layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    // Authenticated when a token is sent; the handler decides
    let roster_routes = Router::new()
        .route("/admin/roster", post(routes::admin::import_roster))
        .layer(from_fn_with_state(state.clone(), optional_jwt_auth_layer));

    let v1_routes = Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .merge(roster_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
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
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(from_fn(request_context))
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

async fn run_authenticated(auth: AuthContext, mut req: Request, next: Next) -> Response {
    req.extensions_mut().insert(auth);
    let mut response = next.run(req).await;

    // Lets the access log name the member
    response.extensions_mut().insert(auth);
    response
}

/// Requires a valid bearer token and injects its [`AuthContext`]
async fn jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.jwt_secret())?;
    Ok(run_authenticated(auth, req, next).await)
}

/// Injects an [`AuthContext`] when a token is present; a bad token is still rejected
async fn optional_jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !req.headers().contains_key(header::AUTHORIZATION) {
        return Ok(next.run(req).await);
    }

    let auth = authenticate(req.headers(), state.jwt_secret())?;
    Ok(run_authenticated(auth, req, next).await)
}
