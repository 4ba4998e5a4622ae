//! Network Request Filter.
//!
//! Installed on the embedding session as a request hook for the messenger's
//! hosts. Cancels loopback diagnostics probes unconditionally, and read-receipt
//! and typing requests when the matching preference is on. Socket upgrades are
//! never cancelled for typing; frames on an open socket belong to the socket
//! interceptor.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::services::embedding::{EmbeddingSession, RequestHandler};
use crate::services::signal_classifier::{self, TypingMatch};
use crate::telemetry::{self, MAX_URL_LOG};
use crate::types::frame::{SuppressionFlags, TraceFlags};
use crate::types::signal::{
    FilterResponse, RequestDetails, SignalKind, SuppressionStats,
};

/// Port the remote page probes on loopback for its own diagnostics.
pub const LOOPBACK_PROBE_PORT: u16 = 3103;

/// Requests the hook is attached to: primary and real-time hosts over
/// secure HTTP and secure sockets, plus the loopback probe port.
pub const INTERCEPT_URL_PATTERNS: &[&str] = &[
    "https://*.messenger.com/*",
    "wss://*.messenger.com/*",
    "https://*.facebook.com/*",
    "wss://*.facebook.com/*",
    "http://localhost:3103/*",
    "http://127.0.0.1:3103/*",
];

/// Why a request was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    LoopbackProbe,
    ReadReceipt,
    Typing,
}

impl CancelReason {
    pub fn label(self) -> &'static str {
        match self {
            CancelReason::LoopbackProbe => "loopback-probe",
            CancelReason::ReadReceipt => "read-receipt",
            CancelReason::Typing => "typing",
        }
    }
}

/// Outcome of running one request through the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Allow,
    Cancel(CancelReason),
}

impl FilterVerdict {
    pub fn is_cancel(self) -> bool {
        matches!(self, FilterVerdict::Cancel(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Any,
    Exact(String),
    /// `*.example.com`: the domain itself or any subdomain.
    Subdomains(String),
}

/// A browser-style match pattern: `scheme://host/path` with `*` wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    scheme: String,
    host: HostPattern,
    port: Option<u16>,
    path: String,
}

impl UrlPattern {
    pub fn parse(pattern: &str) -> Option<Self> {
        let (scheme, rest) = pattern.split_once("://")?;
        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/*"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => (h, Some(p.parse::<u16>().ok()?)),
            None => (authority, None),
        };
        let host = if host == "*" {
            HostPattern::Any
        } else if let Some(domain) = host.strip_prefix("*.") {
            HostPattern::Subdomains(domain.to_lowercase())
        } else {
            HostPattern::Exact(host.to_lowercase())
        };
        Some(Self {
            scheme: scheme.to_lowercase(),
            host,
            port,
            path: path.to_string(),
        })
    }

    pub fn matches(&self, url: &Url) -> bool {
        if self.scheme != "*" && self.scheme != url.scheme() {
            return false;
        }
        let host = match url.host_str() {
            Some(h) => h.to_lowercase(),
            None => return false,
        };
        let host_ok = match &self.host {
            HostPattern::Any => true,
            HostPattern::Exact(h) => &host == h,
            HostPattern::Subdomains(domain) => {
                host == *domain || host.ends_with(&format!(".{}", domain))
            }
        };
        if !host_ok {
            return false;
        }
        if let Some(port) = self.port {
            if url.port_or_known_default() != Some(port) {
                return false;
            }
        }
        let mut path = url.path().to_string();
        if let Some(q) = url.query() {
            path.push('?');
            path.push_str(q);
        }
        glob_match(&self.path, &path)
    }

    pub fn matches_str(&self, url: &str) -> bool {
        Url::parse(url).map(|u| self.matches(&u)).unwrap_or(false)
    }
}

/// `*` matches any run of characters, everything else is literal.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }
    let mut rest = text;
    let first = parts[0];
    if !rest.starts_with(first) {
        return false;
    }
    rest = &rest[first.len()..];
    let last = parts[parts.len() - 1];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// The default pattern set, parsed.
pub fn intercept_patterns() -> Vec<UrlPattern> {
    INTERCEPT_URL_PATTERNS
        .iter()
        .filter_map(|p| UrlPattern::parse(p))
        .collect()
}

/// Whether `url` is routed through the filter at all.
pub fn is_intercepted(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => intercept_patterns().iter().any(|p| p.matches(&parsed)),
        Err(_) => false,
    }
}

pub fn is_loopback_probe(url: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(_) => return false,
    };
    let loopback = matches!(
        parsed.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("[::1]")
    );
    loopback && parsed.port_or_known_default() == Some(LOOPBACK_PROBE_PORT)
}

/// The request policy. Assumes the request already matched the hook's patterns.
pub fn evaluate(flags: &SuppressionFlags, details: &RequestDetails) -> FilterVerdict {
    if is_loopback_probe(&details.url) {
        return FilterVerdict::Cancel(CancelReason::LoopbackProbe);
    }
    if !flags.block_read_receipts && !flags.block_typing_indicator {
        return FilterVerdict::Allow;
    }
    let kind = signal_classifier::classify_request(&details.url, details.body.as_deref());
    if flags.block_read_receipts && kind == SignalKind::ReadReceipt {
        return FilterVerdict::Cancel(CancelReason::ReadReceipt);
    }
    if flags.block_typing_indicator && !details.is_socket() && kind == SignalKind::Typing {
        return FilterVerdict::Cancel(CancelReason::Typing);
    }
    FilterVerdict::Allow
}

/// Token returned by [`NetworkRequestFilter::install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHandle(Uuid);

struct FilterShared {
    flags: SuppressionFlags,
    trace: TraceFlags,
    stats: SuppressionStats,
}

/// Owns the session's request hook and the state it consults.
pub struct NetworkRequestFilter {
    shared: Arc<Mutex<FilterShared>>,
    handle: Option<FilterHandle>,
}

impl NetworkRequestFilter {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(FilterShared {
                flags: SuppressionFlags::default(),
                trace: TraceFlags::default(),
                stats: SuppressionStats::default(),
            })),
            handle: None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<FilterHandle> {
        self.handle
    }

    /// Current cancellation counters.
    pub fn stats(&self) -> SuppressionStats {
        self.shared
            .lock()
            .map(|s| s.stats)
            .unwrap_or_default()
    }

    fn update(&self, flags: SuppressionFlags, trace: TraceFlags) {
        if let Ok(mut s) = self.shared.lock() {
            s.flags = flags;
            s.trace = trace;
        }
    }

    /// Attach the hook with `flags`. If already attached, only the flags change.
    pub fn install(
        &mut self,
        session: &mut dyn EmbeddingSession,
        flags: SuppressionFlags,
        trace: TraceFlags,
    ) -> FilterHandle {
        self.update(flags, trace);
        if let Some(handle) = self.handle {
            return handle;
        }
        let shared = Arc::clone(&self.shared);
        let handler: RequestHandler = Arc::new(move |details: &RequestDetails| {
            Self::handle_request(&shared, details)
        });
        let patterns: Vec<String> = INTERCEPT_URL_PATTERNS.iter().map(|p| p.to_string()).collect();
        session.set_request_hook(&patterns, handler);
        let handle = FilterHandle(Uuid::new_v4());
        self.handle = Some(handle);
        debug!(?flags, "request filter installed");
        handle
    }

    /// Detach the hook. Returns `false` for a stale or foreign handle.
    pub fn uninstall(&mut self, session: &mut dyn EmbeddingSession, handle: FilterHandle) -> bool {
        if self.handle != Some(handle) {
            return false;
        }
        session.clear_request_hook();
        self.handle = None;
        debug!("request filter removed");
        true
    }

    /// Install when either governing flag is on, remove when both are off.
    /// Returns whether the filter is installed afterwards.
    pub fn rearm(
        &mut self,
        session: &mut dyn EmbeddingSession,
        flags: SuppressionFlags,
        trace: TraceFlags,
    ) -> bool {
        if flags.needs_request_filter() {
            self.install(session, flags, trace);
        } else {
            self.update(flags, trace);
            if let Some(handle) = self.handle {
                self.uninstall(session, handle);
            }
        }
        self.is_installed()
    }

    fn handle_request(shared: &Mutex<FilterShared>, details: &RequestDetails) -> FilterResponse {
        let mut state = match shared.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        let verdict = evaluate(&state.flags, details);
        match verdict {
            FilterVerdict::Allow => state.stats.requests_allowed += 1,
            FilterVerdict::Cancel(reason) => {
                match reason {
                    CancelReason::LoopbackProbe => state.stats.loopback_probes_cancelled += 1,
                    CancelReason::ReadReceipt => state.stats.read_receipts_cancelled += 1,
                    CancelReason::Typing => state.stats.typing_requests_cancelled += 1,
                }
                if state.trace.debug_trace {
                    info!(
                        "[BLOCKED] {} {}",
                        reason.label(),
                        telemetry::truncate(&details.url, MAX_URL_LOG)
                    );
                    let heuristic_only = reason == CancelReason::Typing
                        && !signal_classifier::is_typing_url(&details.url)
                        && details.body.as_deref().and_then(signal_classifier::typing_body_match)
                            == Some(TypingMatch::Heuristic);
                    if heuristic_only {
                        debug!("typing matched by the body heuristic only");
                    }
                }
            }
        }
        FilterResponse {
            cancel: verdict.is_cancel(),
        }
    }
}

impl Default for NetworkRequestFilter {
    fn default() -> Self {
        Self::new()
    }
}
