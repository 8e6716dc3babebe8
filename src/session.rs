//! Shared browser session management.
//!
//! One Chromium process serves every request. It is launched lazily on the
//! first capture and shared until a fatal protocol error or shutdown tears
//! it down; the next request after a teardown relaunches transparently.

use crate::{create_browser_config, CaptureError, Config};
use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct LiveBrowser {
    browser: Browser,
    /// Drains the CDP event stream; dies with the browser.
    handler_task: tokio::task::JoinHandle<()>,
}

/// Process-wide handle to the one shared Chromium instance.
///
/// The mutex is held across the launch, so two requests racing for the first
/// tab serialize and exactly one browser process is started. It is released
/// as soon as the tab exists; navigations never hold it.
pub struct BrowserSession {
    config: Arc<Config>,
    inner: Mutex<Option<LiveBrowser>>,
}

impl BrowserSession {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            inner: Mutex::new(None),
        }
    }

    /// Open a fresh tab, launching the browser first if none is live.
    pub async fn new_tab(&self) -> Result<Page, CaptureError> {
        let mut guard = self.inner.lock().await;

        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let live = guard
            .as_ref()
            .ok_or_else(|| CaptureError::BrowserLaunchFailed("session unavailable".to_string()))?;

        live.browser
            .new_page("about:blank")
            .await
            .map_err(CaptureError::from_cdp)
    }

    async fn launch(&self) -> Result<LiveBrowser, CaptureError> {
        info!("🚀 Launching browser");

        let browser_config = create_browser_config(&self.config)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::BrowserLaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
            debug!("Browser handler stream ended");
        });

        Ok(LiveBrowser {
            browser,
            handler_task,
        })
    }

    /// Close the browser process and clear the handle. Idempotent; errors
    /// during close are logged, never raised.
    pub async fn teardown(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(mut live) = guard.take() {
            if let Err(e) = live.browser.close().await {
                warn!("Browser could not be closed cleanly: {e}");
            }
            live.handler_task.abort();
            info!("Browser session torn down");
        }
    }

    /// Whether a browser process is currently live.
    pub async fn is_live(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}
