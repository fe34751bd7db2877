//! HTTP routes: `/metrics` and the 404 fallback.

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tracing::error;

use crate::access_log::AccessLogLayer;
use crate::state::SharedExporter;

const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub(crate) fn router(state: SharedExporter) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .fallback(handle_not_found)
        .with_state(state)
        .layer(AccessLogLayer)
}

/// Runs a scrape and returns its text.
///
/// The scrape runs in its own task: if it panics the response is still a
/// 200 with an empty body, so the target stays scrapable.
pub(crate) async fn handle_metrics(State(exporter): State<SharedExporter>) -> Response {
    let scrape = tokio::spawn(async move {
        let mut exporter = exporter.lock().await;
        exporter.scrape().await
    });

    let body = match scrape.await {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "scrape task failed");
            String::new()
        }
    };

    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

pub(crate) async fn handle_not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
