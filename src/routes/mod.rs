use axum::http::HeaderValue;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;

pub mod appointments;
pub mod auth;
pub mod health;
pub mod practices;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let public_routes = Router::new()
        .route("/practices", get(practices::list_practices))
        .route("/practices/:id", get(practices::practice_detail))
        .route("/practices/:id/slots", get(practices::practice_slots))
        .route("/appointments", post(appointments::book_appointment));

    let practice_routes = Router::new()
        .route("/appointments", get(appointments::list_appointments))
        .route(
            "/appointments/:id/cancel",
            patch(appointments::cancel_appointment),
        )
        .route(
            "/appointments/:id/reschedule",
            patch(appointments::reschedule_appointment),
        );

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/public", public_routes)
        .nest("/practice", practice_routes)
        .route("/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
}
