//! HTTP layer: REST handlers, OpenAPI document and router composition.

pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::http::{Method, StatusCode};
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Upper bound on producing an HTTP response. Does not limit the lifetime
/// of an upgraded WebSocket.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenAPI document for the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "pos-server", description = "Order-update push server"),
    paths(handlers::system::health_handler, handlers::system::status_handler),
    components(schemas(
        handlers::system::HealthResponse,
        handlers::system::StatusResponse,
        crate::broadcast::BroadcastStats,
    ))
)]
pub struct ApiDoc;

/// Cross-origin policy of the handshake and REST endpoints: any origin,
/// `GET` and `POST`.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
}

/// Answers `408 Request Timeout` when a handler exceeds
/// [`REQUEST_TIMEOUT`].
fn timeout_layer() -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT)
}

/// Builds the complete router: REST endpoints, `/ws`, OpenAPI, layers.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(handlers::routes())
        .route("/ws", get(ws_handler))
        .route(
            "/api-docs/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        );

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/swagger.json", ApiDoc::openapi()),
    );

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer())
                .layer(timeout_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out_with_408() {
        let app: Router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    "late"
                }),
            )
            .layer(timeout_layer());

        let Ok(request) = Request::builder().uri("/slow").body(Body::empty()) else {
            panic!("request should build");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
