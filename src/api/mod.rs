//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`. The query-string
//! command surface, health and roster live at the root.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document covering every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "squad-shift-gateway", description = "Rescue squad shift schedules"),
    paths(
        handlers::command::query_command,
        handlers::command::post_command,
        handlers::days::get_day,
        handlers::days::apply_day,
        handlers::snapshots::list_snapshots,
        handlers::snapshots::revert_day,
        handlers::snapshots::expire_snapshots,
        handlers::months::generate_month,
        handlers::system::health_handler,
        handlers::system::roster_handler,
    ),
    components(schemas(crate::error::ErrorResponse))
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::command::legacy_routes())
        .merge(handlers::system::routes());
    with_docs(router)
}

#[cfg(feature = "swagger-ui")]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    router
}
