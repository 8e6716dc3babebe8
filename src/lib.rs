//! # pagesnap
//!
//! An HTTP service that renders an arbitrary web page in headless Chromium
//! and answers with a PNG screenshot.
//!
//! The interesting part is the navigation control core: every sub-resource
//! a page requests is intercepted and either allowed or aborted (data URIs
//! always pass; a circuit breaker cuts everything off after 15 seconds,
//! 100 allowed resources, or request completion; denylisted and low-value
//! resources are dropped), redirects that point back at the serving host
//! fail the navigation immediately, and the screenshot itself runs under a
//! hard 20 second deadline. One browser process is shared by all requests
//! and relaunched on demand; each request owns exactly one tab and tears it
//! down on every exit path.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pagesnap::{BrowserSession, CaptureRequest, CaptureService, Config, Metrics};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::default());
//!     let session = Arc::new(BrowserSession::new(config.clone()));
//!     let service = CaptureService::new(session, config, Arc::new(Metrics::new()));
//!
//!     let request = CaptureRequest::new("https://example.com", None, None, "")?;
//!     let png = service.capture(request).await?;
//!     println!("Captured {} bytes", png.len());
//!     Ok(())
//! }
//! ```
//!
//! ## HTTP usage
//!
//! ```bash
//! pagesnap --port 3000
//! curl 'http://localhost:3000/?url=https://example.com&width=800&height=600' > shot.png
//! ```

/// Configuration, per-request data, and browser launch flags
pub mod config;

/// Error taxonomy and CDP error classification
pub mod error;

/// Per-navigation sub-resource allow/abort policy
pub mod interceptor;

/// Redirect-loop detection on navigation responses
pub mod redirect;

/// Shared browser process lifecycle
pub mod session;

/// Per-request capture orchestration
pub mod capture;

/// HTTP routes
pub mod server;

/// Capture metrics
pub mod metrics;

/// Command-line interface
pub mod cli;

#[cfg(test)]
mod tests;

pub use capture::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use interceptor::*;
pub use metrics::*;
pub use redirect::*;
pub use server::*;
pub use session::*;
