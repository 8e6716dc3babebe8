//! Per-navigation request interception.
//!
//! Every sub-resource a page requests during navigation is paused by the
//! browser and routed through [`RequestInterceptor::decide`], which either
//! lets it continue or aborts it. Decisions are evaluated in a fixed order:
//! data URIs pass unconditionally, then the navigation-wide circuit breaker,
//! then the denylist and low-value resource categories.

use chromiumoxide::cdp::browser_protocol::fetch::EventRequestPaused;
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Wall-clock budget for sub-resource loading, measured from navigation
/// start. Resources requested after this are aborted.
pub const RESOURCE_TIME_LIMIT: Duration = Duration::from_secs(15);

/// Maximum number of sub-resources allowed per navigation.
pub const RESOURCE_COUNT_LIMIT: usize = 100;

/// URLs longer than this are truncated in log output.
pub const MAX_LOGGED_URL_LEN: usize = 70;

/// Per-navigation elapsed time, allowed-request count, and completion latch.
///
/// Shared between the capture pipeline and the interception task; all state
/// is atomic so decisions never block the event stream.
#[derive(Debug)]
pub struct NavigationTimer {
    started: Instant,
    allowed: AtomicUsize,
    completed: AtomicBool,
}

impl NavigationTimer {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Self {
            started,
            allowed: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn allowed_count(&self) -> usize {
        self.allowed.load(Ordering::Relaxed)
    }

    pub fn record_allowed(&self) -> usize {
        self.allowed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Latch the navigation as finished. One-way; stragglers observed after
    /// this are aborted by the circuit breaker.
    pub fn mark_complete(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }

    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Whether the circuit breaker condition holds.
    pub fn tripped(&self) -> bool {
        self.elapsed() > RESOURCE_TIME_LIMIT
            || self.allowed_count() >= RESOURCE_COUNT_LIMIT
            || self.is_complete()
    }
}

impl Default for NavigationTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// One observed outbound request within a navigation.
#[derive(Debug, Clone)]
pub struct InterceptedResource {
    pub url: String,
    pub method: String,
    pub resource_type: ResourceType,
    /// Time since navigation start when this request was observed
    pub elapsed: Duration,
    /// Resources already allowed in this navigation when this one arrived
    pub seen: usize,
}

impl InterceptedResource {
    pub fn from_event(event: &EventRequestPaused, timer: &NavigationTimer) -> Self {
        Self {
            url: event.request.url.clone(),
            method: event.request.method.clone(),
            resource_type: event.resource_type.clone(),
            elapsed: timer.elapsed(),
            seen: timer.allowed_count(),
        }
    }
}

/// Outcome of a single interception decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow,
    Abort(ErrorReason),
}

/// The allow/abort policy for one navigation's sub-resources.
///
/// Stateless apart from the denylist; all per-navigation state lives in the
/// [`NavigationTimer`] so the policy itself can be shared.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    denylist: Vec<String>,
}

impl RequestInterceptor {
    /// Patterns are matched case-insensitively as substrings of the full
    /// request URL.
    pub fn new(denylist: Vec<String>) -> Self {
        Self {
            denylist: denylist
                .into_iter()
                .map(|pattern| pattern.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn decide(&self, resource: &InterceptedResource, timer: &NavigationTimer) -> Decision {
        let short_url = truncate(&resource.url, MAX_LOGGED_URL_LEN);

        // Inline payloads cost no network round-trip and cannot loop.
        if is_data_uri(&resource.url) {
            debug!("✅ {} {}", resource.method, short_url);
            return Decision::Allow;
        }

        // Circuit breaker: once the navigation has run too long, requested
        // too much, or already finished, everything else is cut off.
        if timer.tripped() {
            debug!("❌⏳ {} {}", resource.method, short_url);
            return Decision::Abort(ErrorReason::Aborted);
        }

        if self.matches_denylist(&resource.url) || is_low_value(&resource.resource_type) {
            debug!("❌ {} {}", resource.method, short_url);
            return Decision::Abort(ErrorReason::BlockedByClient);
        }

        timer.record_allowed();
        debug!("✅ {} {}", resource.method, short_url);
        Decision::Allow
    }

    fn matches_denylist(&self, url: &str) -> bool {
        let url = url.to_ascii_lowercase();
        self.denylist.iter().any(|pattern| url.contains(pattern))
    }
}

fn is_data_uri(url: &str) -> bool {
    url.get(..5)
        .map(|prefix| prefix.eq_ignore_ascii_case("data:"))
        .unwrap_or(false)
}

/// Manifests and uncategorized fetches don't contribute to the rendered
/// page.
fn is_low_value(resource_type: &ResourceType) -> bool {
    matches!(resource_type, ResourceType::Manifest | ResourceType::Other)
}

/// Truncate to `max` characters with an ellipsis marker.
pub fn truncate(input: &str, max: usize) -> String {
    if input.chars().count() > max {
        let mut short: String = input.chars().take(max).collect();
        short.push('…');
        short
    } else {
        input.to_string()
    }
}
