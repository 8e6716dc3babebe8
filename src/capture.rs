//! Per-request capture orchestration.
//!
//! One [`CaptureService::capture`] call owns one browser tab from creation
//! to teardown. It wires the request interceptor into the tab's paused
//! request stream and the redirect-loop detector into its response stream,
//! races navigation against the detector, waits out the stabilization
//! delay, and takes the screenshot under a hard timeout. The tab never
//! outlives the request, whatever the outcome.

use crate::{
    BrowserSession, CaptureError, CaptureRequest, Config, Decision, InterceptedResource, Metrics,
    NavigationTimer, RedirectLoopDetector, RequestInterceptor,
};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventResponseReceived,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Hard ceiling on the screenshot operation itself, separate from the
/// sub-resource time budget.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(20);

/// Orchestrates screenshot captures against the shared browser session.
pub struct CaptureService {
    session: Arc<BrowserSession>,
    config: Arc<Config>,
    interceptor: Arc<RequestInterceptor>,
    metrics: Arc<Metrics>,
}

impl CaptureService {
    pub fn new(session: Arc<BrowserSession>, config: Arc<Config>, metrics: Arc<Metrics>) -> Self {
        let interceptor = Arc::new(RequestInterceptor::new(config.denylist.clone()));
        Self {
            session,
            config,
            interceptor,
            metrics,
        }
    }

    /// Capture one page as PNG bytes.
    pub async fn capture(&self, request: CaptureRequest) -> Result<Vec<u8>, CaptureError> {
        info!(
            "📸 Capturing {} ({}x{}) [{}]",
            request.url, request.width, request.height, request.id
        );
        let started = Instant::now();

        let page = match self.session.new_tab().await {
            Ok(page) => page,
            Err(e) => {
                self.handle_failure(&e).await;
                self.metrics.record_capture(started.elapsed(), false);
                return Err(e);
            }
        };

        let timer = Arc::new(NavigationTimer::new());
        let mut listeners: Vec<AbortHandle> = Vec::new();

        let result = self.drive(&page, &request, &timer, &mut listeners).await;

        // Latch the terminal outcome first so stragglers still hitting the
        // interceptor are aborted while the tab is dismantled.
        timer.mark_complete();
        for listener in &listeners {
            listener.abort();
        }

        match &result {
            Ok(bytes) => {
                self.metrics.record_capture(started.elapsed(), true);
                info!("💥 Captured {} ({} bytes)", request.url, bytes.len());
            }
            Err(e) => {
                self.metrics.record_capture(started.elapsed(), false);
                self.metrics.record_error(e);
                warn!("💔 Capture of {} failed: {e}", request.url);
                self.handle_failure(e).await;
            }
        }

        if result.is_err() && self.config.debug {
            warn!("Debug mode: leaving the tab of {} open", request.url);
        } else if let Err(e) = page.close().await {
            debug!("Tab close failed: {e}");
        }

        result
    }

    async fn drive(
        &self,
        page: &Page,
        request: &CaptureRequest,
        timer: &Arc<NavigationTimer>,
        listeners: &mut Vec<AbortHandle>,
    ) -> Result<Vec<u8>, CaptureError> {
        set_viewport(page, request).await?;

        // Subscribe before enabling the domains so no early event is missed.
        let mut request_events = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(CaptureError::from_cdp)?;
        let mut response_events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(CaptureError::from_cdp)?;

        page.execute(fetch_enable_params())
            .await
            .map_err(CaptureError::from_cdp)?;
        page.execute(NetworkEnableParams::default())
            .await
            .map_err(CaptureError::from_cdp)?;

        // Interception: every paused sub-resource request goes through the
        // classifier and is continued or failed accordingly.
        let interception = {
            let page = page.clone();
            let timer = timer.clone();
            let interceptor = self.interceptor.clone();
            tokio::spawn(async move {
                while let Some(event) = request_events.next().await {
                    let resource = InterceptedResource::from_event(&event, &timer);
                    let command = match interceptor.decide(&resource, &timer) {
                        Decision::Allow => page
                            .execute(ContinueRequestParams::new(event.request_id.clone()))
                            .await
                            .map(|_| ()),
                        Decision::Abort(reason) => page
                            .execute(FailRequestParams::new(event.request_id.clone(), reason))
                            .await
                            .map(|_| ()),
                    };
                    if let Err(e) = command {
                        debug!("Interception command failed: {e}");
                    }
                }
            })
        };
        listeners.push(interception.abort_handle());

        // Detection: the first response redirecting back to the serving
        // host signals a loop.
        let (loop_tx, loop_rx) = oneshot::channel::<()>();
        let detection = {
            let detector = RedirectLoopDetector::new(request.serving_host.clone());
            tokio::spawn(async move {
                let mut signal = Some(loop_tx);
                while let Some(event) = response_events.next().await {
                    if detector.observe(&event.response.headers) {
                        if let Some(signal) = signal.take() {
                            let _ = signal.send(());
                        }
                        break;
                    }
                }
            })
        };
        listeners.push(detection.abort_handle());

        info!("⬇️ Fetching {}", request.url);
        let navigation = async {
            page.goto(request.url.as_str())
                .await
                .map_err(CaptureError::from_cdp)?;
            page.wait_for_navigation()
                .await
                .map_err(CaptureError::from_cdp)?;
            Ok::<(), CaptureError>(())
        };
        tokio::pin!(navigation);

        // Navigation races the detector; whichever settles first decides.
        tokio::select! {
            outcome = &mut navigation => outcome?,
            signal = loop_rx => {
                if signal.is_ok() {
                    return Err(CaptureError::RedirectLoop);
                }
                // Detector stream closed without firing; the navigation
                // outcome still stands.
                navigation.await?;
            }
        }

        // Arbitrary wait until asynchronous rendering stabilizes.
        sleep(self.config.stabilization_delay).await;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        bounded_capture(page.screenshot(params)).await
    }

    async fn handle_failure(&self, error: &CaptureError) {
        if error.is_fatal() {
            warn!("🕸 Browser control channel failed, tearing down the session");
            self.metrics.record_session_teardown();
            self.session.teardown().await;
        }
    }
}

/// Intercept every outbound request at the request stage.
fn fetch_enable_params() -> FetchEnableParams {
    FetchEnableParams::builder()
        .pattern(
            RequestPattern::builder()
                .url_pattern("*")
                .request_stage(RequestStage::Request)
                .build(),
        )
        .build()
}

async fn set_viewport(page: &Page, request: &CaptureRequest) -> Result<(), CaptureError> {
    let params = SetDeviceMetricsOverrideParams::builder()
        .width(request.width)
        .height(request.height)
        .device_scale_factor(1.0)
        .mobile(false)
        .build()
        .map_err(CaptureError::NavigationFailed)?;
    page.execute(params).await.map_err(CaptureError::from_cdp)?;
    Ok(())
}

/// Run the screenshot operation under the capture deadline.
async fn bounded_capture<F>(capture: F) -> Result<Vec<u8>, CaptureError>
where
    F: Future<Output = Result<Vec<u8>, CdpError>>,
{
    match timeout(CAPTURE_TIMEOUT, capture).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(CaptureError::from_cdp(e)),
        Err(_) => Err(CaptureError::CaptureTimeout(CAPTURE_TIMEOUT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stalled_capture_times_out() {
        let result = bounded_capture(futures::future::pending()).await;
        assert!(matches!(
            result,
            Err(CaptureError::CaptureTimeout(t)) if t == CAPTURE_TIMEOUT
        ));
    }

    #[tokio::test]
    async fn test_capture_errors_pass_through() {
        let result = bounded_capture(async { Err(CdpError::NoResponse) }).await;
        assert!(matches!(result, Err(CaptureError::ConnectionLost(_))));

        let result = bounded_capture(async { Ok(vec![0x89, 0x50, 0x4e, 0x47]) }).await;
        assert_eq!(result.unwrap(), vec![0x89, 0x50, 0x4e, 0x47]);
    }
}
