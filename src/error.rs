use chromiumoxide::error::CdpError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Missing URL.")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Possible infinite redirects detected.")]
    RedirectLoop,

    #[error("Navigation timed out")]
    NavigationTimeout,

    #[error("Screenshot timed out after {0:?}")]
    CaptureTimeout(Duration),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Browser connection lost: {0}")]
    ConnectionLost(String),
}

impl CaptureError {
    /// Whether the shared browser session itself is broken. A dead control
    /// channel invalidates every tab, not just this request's.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::ConnectionLost(_))
    }

    /// Classify a CDP-level failure. Websocket and channel errors mean the
    /// browser process is unreachable; everything else is scoped to the
    /// current navigation.
    pub fn from_cdp(err: CdpError) -> Self {
        match err {
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                CaptureError::ConnectionLost(err.to_string())
            }
            CdpError::Timeout => CaptureError::NavigationTimeout,
            other => CaptureError::NavigationFailed(other.to_string()),
        }
    }

    /// Body text returned to the HTTP caller.
    pub fn user_message(&self) -> String {
        format!("Oops. Something is wrong.\n\n{self}")
    }
}
