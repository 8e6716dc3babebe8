#[cfg(test)]
mod integration_tests {
    use crate::{router, BrowserSession, CaptureService, Config, Metrics};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Service with a session that never launches a browser unless a
    /// capture actually runs.
    fn test_app() -> (Arc<BrowserSession>, Router) {
        let config = Arc::new(Config::default());
        let session = Arc::new(BrowserSession::new(config.clone()));
        let service = Arc::new(CaptureService::new(
            session.clone(),
            config,
            Arc::new(Metrics::new()),
        ));
        (session, router(service))
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_status_route() {
        let (_, app) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_favicon_route() {
        let (_, app) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/favicon.ico")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_landing_page() {
        let (_, app) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/html"));
        assert!(body_text(response).await.contains("<form"));
    }

    #[tokio::test]
    async fn test_missing_url_rejected_without_browser_launch() {
        let (session, app) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/?width=800")
                    .header(header::HOST, "localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_text(response).await;
        assert!(body.starts_with("Oops. Something is wrong.\n\n"));
        assert!(body.contains("Missing URL"));
        assert!(!session.is_live().await);
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let (session, app) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/?url=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Missing URL"));
        assert!(!session.is_live().await);
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_without_browser_launch() {
        let (session, app) = test_app();
        for bad in ["/?url=not-a-url", "/?url=ftp%3A%2F%2Fexample.com"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(bad).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(body_text(response).await.contains("Invalid URL"));
        }
        assert!(!session.is_live().await);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (_, app) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nowhere")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_default_denylist_blocks_common_trackers() {
        let denylist = crate::default_denylist();
        assert!(denylist.iter().any(|p| p.contains("doubleclick")));
        assert!(denylist.iter().any(|p| p.contains("google-analytics")));
    }
}
