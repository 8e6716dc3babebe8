//! Redirect-loop detection.
//!
//! A page that answers with a `Location` header pointing back at this
//! service would bounce through it until the resource budget runs out.
//! The detector watches every navigation response and trips the first time
//! such a header appears.

use chromiumoxide::cdp::browser_protocol::network::Headers;
use std::sync::atomic::{AtomicBool, Ordering};

/// Watches response headers of one navigation for redirects that point back
/// at the serving host. Fires at most once.
#[derive(Debug)]
pub struct RedirectLoopDetector {
    serving_host: String,
    fired: AtomicBool,
}

impl RedirectLoopDetector {
    pub fn new(serving_host: impl Into<String>) -> Self {
        Self {
            serving_host: serving_host.into(),
            fired: AtomicBool::new(false),
        }
    }

    /// Returns true exactly once, on the first response whose `Location`
    /// header contains the serving host.
    pub fn observe(&self, headers: &Headers) -> bool {
        if self.serving_host.is_empty() {
            return false;
        }

        let Some(location) = location_header(headers) else {
            return false;
        };

        location.contains(&self.serving_host) && !self.fired.swap(true, Ordering::SeqCst)
    }
}

/// Case-insensitive `Location` lookup in a CDP headers object.
fn location_header(headers: &Headers) -> Option<String> {
    let map = headers.inner().as_object()?;
    map.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("location"))
        .and_then(|(_, value)| value.as_str())
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(value: serde_json::Value) -> Headers {
        Headers::new(value)
    }

    #[test]
    fn test_loop_back_to_serving_host_detected() {
        let detector = RedirectLoopDetector::new("snap.example.net");
        let response = headers(json!({
            "location": "https://snap.example.net/loop"
        }));
        assert!(detector.observe(&response));
    }

    #[test]
    fn test_header_name_is_case_insensitive() {
        let detector = RedirectLoopDetector::new("snap.example.net");
        let response = headers(json!({
            "Location": "http://snap.example.net/?url=x"
        }));
        assert!(detector.observe(&response));
    }

    #[test]
    fn test_foreign_redirects_pass() {
        let detector = RedirectLoopDetector::new("snap.example.net");
        let response = headers(json!({
            "location": "https://elsewhere.example.com/moved"
        }));
        assert!(!detector.observe(&response));
    }

    #[test]
    fn test_responses_without_location_pass() {
        let detector = RedirectLoopDetector::new("snap.example.net");
        assert!(!detector.observe(&headers(json!({"content-type": "text/html"}))));
        assert!(!detector.observe(&headers(json!(null))));
    }

    #[test]
    fn test_fires_at_most_once() {
        let detector = RedirectLoopDetector::new("snap.example.net");
        let response = headers(json!({
            "location": "https://snap.example.net/loop"
        }));
        assert!(detector.observe(&response));
        assert!(!detector.observe(&response));
    }

    #[test]
    fn test_empty_serving_host_never_matches() {
        let detector = RedirectLoopDetector::new("");
        let response = headers(json!({
            "location": "https://anything.example.com/"
        }));
        assert!(!detector.observe(&response));
    }
}
