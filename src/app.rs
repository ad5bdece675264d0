use axum::{extract::DefaultBodyLimit, middleware, routing::get, Json, Router};
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};

use crate::{
    app_state::AppState,
    middleware::{language_middleware, observability_middleware},
    modules::{
        accounts::{accounts_routes, handlers::home},
        admin::admin_routes,
        certificates::certificate_routes,
        i18n::create_i18n_routes,
        jobs::job_routes,
        kaprodi::kaprodi_routes,
        notifications::notification_routes,
        student::student_routes,
        supervisor::supervisor_routes,
    },
    websocket::websocket_routes,
};

/// Multipart forms carry up to four documents plus text fields.
const FILES_PER_REQUEST: usize = 4;
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.env.app.static_dir.clone();
    let media_dir = state.env.app.media_dir.clone();
    let body_limit = state.env.app.max_upload_bytes * FILES_PER_REQUEST + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .merge(websocket_routes())
        .merge(certificate_routes())
        .nest("/accounts", accounts_routes())
        .nest("/student", student_routes())
        .nest("/supervisor", supervisor_routes())
        .nest("/admin", admin_routes())
        .nest("/kaprodi", kaprodi_routes())
        .nest("/jobs", job_routes())
        .nest("/notifications", notification_routes())
        .nest("/i18n", create_i18n_routes())
        .nest_service("/static", ServeDir::new(static_dir))
        .nest_service("/media", ServeDir::new(media_dir))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn(language_middleware))
        .layer(middleware::from_fn(observability_middleware))
        .with_state(state)
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let db_result = sqlx::query("SELECT 1").execute(&state.db).await;

    let db_status = match db_result {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::info!("Database health check failed: {}", e);
            "unhealthy"
        }
    };

    let telemetry_health = crate::telemetry::telemetry_health_check();
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(json!({
        "status": "ok",
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "telemetry": telemetry_health
        }
    }))
}
