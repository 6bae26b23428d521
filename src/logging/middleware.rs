use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

/// One line per request, levelled by status class.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let req_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(request).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::error!(request_id = %req_id, %method, %path, status, latency_ms, "request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(request_id = %req_id, %method, %path, status, latency_ms, "request rejected");
    } else {
        tracing::info!(request_id = %req_id, %method, %path, status, latency_ms, "request completed");
    }

    response
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
