use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::AppConfig;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, mask_internal_errors};
use crate::state::AppState;

/// Full application router: public routes, the versioned API and global middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(public::login_post))
        .merge(protected_routes(state.clone()));

    let prefix = state.config.server.api_prefix.trim_end_matches('/').to_string();
    let router = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health));
    let router = if prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(&prefix, api)
    };

    router
        .fallback(public::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), mask_internal_errors))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, baptism, death, marriage, member, parish, wereda};

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/me", get(auth::me_get))
        .route("/wereda-units", get(wereda::list).post(wereda::create))
        .route(
            "/wereda-units/:id",
            get(wereda::show).put(wereda::update).patch(wereda::update),
        )
        .route("/parishes", get(parish::list).post(parish::create))
        .route("/parishes/by-wereda/:wereda_id", get(parish::by_wereda))
        .route(
            "/parishes/:id",
            get(parish::show).put(parish::update).patch(parish::update),
        )
        .route("/members", get(member::list).post(member::create))
        .route("/members/statistics", get(member::statistics))
        .route(
            "/members/:id",
            get(member::show)
                .put(member::update)
                .patch(member::update)
                .delete(member::delete),
        )
        .route("/baptisms", get(baptism::list).post(baptism::create))
        .route(
            "/baptisms/:id",
            get(baptism::show).put(baptism::update).patch(baptism::update),
        )
        .route("/marriages", get(marriage::list).post(marriage::create))
        .route(
            "/marriages/:id",
            get(marriage::show).put(marriage::update).patch(marriage::update),
        )
        .route("/marriages/:id/divorce", put(marriage::divorce))
        .route("/deaths", get(death::list).post(death::create))
        .route(
            "/deaths/:id",
            get(death::show)
                .put(death::update)
                .patch(death::update)
                .delete(death::delete),
        )
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = &config.security.cors_origins;
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    base.allow_origin(allowed)
}
