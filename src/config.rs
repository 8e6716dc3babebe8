//! Configuration for the capture service.
//!
//! Runtime settings come from three layers: built-in defaults, environment
//! variables, and CLI flags, each overriding the previous. The environment
//! names match the ones the service is deployed with (`PORT`, `DEBUG`,
//! `HEADFUL`, `CHROME_BIN`, `PRE_SCREENSHOT_RENDER_WAIT_TIME`).

use crate::CaptureError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Viewport width applied when the request doesn't specify one.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;

/// Viewport height applied when the request doesn't specify one.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 768;

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default settle time between navigation completion and capture.
pub const DEFAULT_STABILIZATION_MS: u64 = 500;

/// Service configuration, shared read-only across all requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// HTTP listen port (default: 3000)
    pub port: u16,

    /// Debug mode: verbose logging, and tabs of failed requests are kept
    /// open for inspection instead of being force-closed.
    pub debug: bool,

    /// Run the browser with a visible window and devtools auto-opened.
    pub headful: bool,

    /// Path to a Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Wait after navigation completes, before capturing, so fonts and
    /// late reflows settle.
    pub stabilization_delay: Duration,

    /// Substring patterns of sub-resource URLs to abort. Matched
    /// case-insensitively against the full request URL.
    pub denylist: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            debug: false,
            headful: false,
            chrome_path: None,
            stabilization_delay: Duration::from_millis(DEFAULT_STABILIZATION_MS),
            denylist: default_denylist(),
        }
    }
}

impl Config {
    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = std::env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            config.port = port;
        }
        config.debug = env_flag("DEBUG");
        config.headful = env_flag("HEADFUL");
        if let Ok(path) = std::env::var("CHROME_BIN") {
            if !path.is_empty() {
                config.chrome_path = Some(path);
            }
        }
        if let Some(ms) = std::env::var("PRE_SCREENSHOT_RENDER_WAIT_TIME")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.stabilization_delay = Duration::from_millis(ms);
        }

        config
    }
}

fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false"),
        Err(_) => false,
    }
}

/// Built-in denylist of ad and tracker hosts, used when no external list
/// is supplied.
pub fn default_denylist() -> Vec<String> {
    [
        "googletagmanager.com",
        "googlesyndication.com",
        "googleadservices.com",
        "google-analytics.com",
        "doubleclick.net",
        "adsystem",
        "adnxs.com",
        "amazon-adsystem.com",
        "hotjar.com",
        "mixpanel.com",
        "segment.com",
        "facebook.com/tr",
        "/ads/",
        "/advertisement/",
    ]
    .iter()
    .map(|pattern| pattern.to_string())
    .collect()
}

/// One incoming screenshot request, validated and frozen before any browser
/// work starts.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Correlation id for log lines
    pub id: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Host header of the serving endpoint, used for redirect-loop detection
    pub serving_host: String,
    pub created_at: Instant,
}

impl CaptureRequest {
    pub fn new(
        url: &str,
        width: Option<u32>,
        height: Option<u32>,
        serving_host: &str,
    ) -> Result<Self, CaptureError> {
        if url.is_empty() {
            return Err(CaptureError::MissingUrl);
        }

        let parsed = url::Url::parse(url).map_err(|_| CaptureError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CaptureError::InvalidUrl(url.to_string()));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            width: width.unwrap_or(DEFAULT_VIEWPORT_WIDTH),
            height: height.unwrap_or(DEFAULT_VIEWPORT_HEIGHT),
            serving_host: serving_host.to_string(),
            created_at: Instant::now(),
        })
    }
}

/// Parse a viewport dimension query value, falling back to the default for
/// anything that isn't a positive integer.
pub fn parse_dimension(value: Option<&str>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Chromium command-line arguments for screenshot duty.
pub fn get_chrome_args(config: &Config) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--hide-scrollbars".to_string(),
    ];

    if config.headful {
        args.push("--auto-open-devtools-for-tabs".to_string());
    }

    args
}

pub fn create_browser_config(
    config: &Config,
) -> Result<chromiumoxide::browser::BrowserConfig, CaptureError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT)
        .args(get_chrome_args(config));

    if config.headful {
        builder = builder.with_head();
    }

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(CaptureError::BrowserLaunchFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(!config.debug);
        assert!(!config.headful);
        assert!(config.chrome_path.is_none());
        assert_eq!(config.stabilization_delay, Duration::from_millis(500));
        assert!(!config.denylist.is_empty());
    }

    #[test]
    fn test_chrome_args() {
        let config = Config::default();
        let args = get_chrome_args(&config);
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--disable-setuid-sandbox".to_string()));
        assert!(!args.contains(&"--auto-open-devtools-for-tabs".to_string()));

        let headful = Config {
            headful: true,
            ..Default::default()
        };
        let args = get_chrome_args(&headful);
        assert!(args.contains(&"--auto-open-devtools-for-tabs".to_string()));
    }

    #[test]
    fn test_request_validation() {
        assert!(matches!(
            CaptureRequest::new("", None, None, "localhost:3000"),
            Err(CaptureError::MissingUrl)
        ));
        assert!(matches!(
            CaptureRequest::new("not-a-url", None, None, "localhost:3000"),
            Err(CaptureError::InvalidUrl(_))
        ));
        assert!(matches!(
            CaptureRequest::new("ftp://example.com", None, None, "localhost:3000"),
            Err(CaptureError::InvalidUrl(_))
        ));

        let request =
            CaptureRequest::new("https://example.com", Some(800), None, "localhost:3000").unwrap();
        assert_eq!(request.width, 800);
        assert_eq!(request.height, DEFAULT_VIEWPORT_HEIGHT);
        assert!(!request.id.is_empty());
        assert_eq!(request.serving_host, "localhost:3000");
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension(Some("800"), 1024), 800);
        assert_eq!(parse_dimension(Some(" 600 "), 1024), 600);
        assert_eq!(parse_dimension(Some("0"), 1024), 1024);
        assert_eq!(parse_dimension(Some("abc"), 1024), 1024);
        assert_eq!(parse_dimension(Some("-5"), 1024), 1024);
        assert_eq!(parse_dimension(None, 1024), 1024);
    }
}
