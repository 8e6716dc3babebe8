//! HTTP surface.
//!
//! A single screenshot endpoint plus the static landing page and probe
//! routes. All capture failures surface as `400` with a plain-text body;
//! nothing here retries.

use crate::{
    parse_dimension, CaptureError, CaptureRequest, CaptureService, DEFAULT_VIEWPORT_HEIGHT,
    DEFAULT_VIEWPORT_WIDTH,
};
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

const LANDING_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>pagesnap</title></head>
<body>
<h1>pagesnap</h1>
<p>Renders a web page and returns a PNG screenshot.</p>
<form action="/" method="get">
  <input type="url" name="url" placeholder="https://example.com" required>
  <input type="number" name="width" placeholder="1024">
  <input type="number" name="height" placeholder="768">
  <button type="submit">Screenshot</button>
</form>
</body>
</html>
"#;

pub fn router(service: Arc<CaptureService>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/favicon.ico", get(favicon))
        .route("/status", get(status))
        .with_state(service)
}

/// `GET /` — landing page without a query string, screenshot capture with
/// one.
async fn index(
    State(service): State<Arc<CaptureService>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Html(LANDING_PAGE).into_response();
    };

    let params = ScreenshotQuery::parse(&query);
    let serving_host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let request = match params.url.as_deref() {
        None => return error_response(&CaptureError::MissingUrl),
        Some(url) => match CaptureRequest::new(url, params.width, params.height, serving_host) {
            Ok(request) => request,
            Err(e) => return error_response(&e),
        },
    };

    match service.capture(request).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Liveness probe.
async fn status() -> StatusCode {
    StatusCode::OK
}

fn error_response(error: &CaptureError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "text/plain")],
        error.user_message(),
    )
        .into_response()
}

#[derive(Debug, Default)]
struct ScreenshotQuery {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

impl ScreenshotQuery {
    fn parse(query: &str) -> Self {
        let mut parsed = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "url" => parsed.url = Some(value.into_owned()),
                "width" => {
                    parsed.width = Some(parse_dimension(Some(&value), DEFAULT_VIEWPORT_WIDTH))
                }
                "height" => {
                    parsed.height = Some(parse_dimension(Some(&value), DEFAULT_VIEWPORT_HEIGHT))
                }
                _ => {}
            }
        }
        parsed
    }
}
