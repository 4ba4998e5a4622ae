use serde::{Deserialize, Serialize};

/// What an intercepted request or socket frame was recognised as.
///
/// Computed per event and never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SignalKind {
    None,
    ReadReceipt,
    Typing,
    ActiveStatus,
}

impl SignalKind {
    pub fn is_signal(self) -> bool {
        self != SignalKind::None
    }

    pub fn from_label(label: &str) -> Option<SignalKind> {
        match label {
            "none" => Some(SignalKind::None),
            "read-receipt" => Some(SignalKind::ReadReceipt),
            "typing" => Some(SignalKind::Typing),
            "active-status" => Some(SignalKind::ActiveStatus),
            _ => None,
        }
    }

    /// Short label used in trace lines and stats keys.
    pub fn label(self) -> &'static str {
        match self {
            SignalKind::None => "none",
            SignalKind::ReadReceipt => "read-receipt",
            SignalKind::Typing => "typing",
            SignalKind::ActiveStatus => "active-status",
        }
    }
}

/// The three places a signal can leave the page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InterceptionTarget {
    /// Outgoing HTTP(S) requests, filtered in the privileged process.
    HttpRequest,
    /// Frames sent over the page's live socket, filtered in the page context.
    SocketFrame,
    /// `document.hidden` / `visibilityState` / `hasFocus()`, overridden in the page context.
    VisibilityApi,
}

/// A payload handed to the page's socket `send()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketPayload {
    Text(String),
    /// ArrayBuffer / typed-array payloads.
    Binary(Vec<u8>),
}

impl SocketPayload {
    pub fn len(&self) -> usize {
        match self {
            SocketPayload::Text(s) => s.len(),
            SocketPayload::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for SocketPayload {
    fn from(s: &str) -> Self {
        SocketPayload::Text(s.to_string())
    }
}

impl From<Vec<u8>> for SocketPayload {
    fn from(b: Vec<u8>) -> Self {
        SocketPayload::Binary(b)
    }
}

/// Resource type reported by the embedding session for an outgoing request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Xhr,
    Fetch,
    WebSocket,
    Ping,
    Other,
}

/// An outgoing request as seen by the request-interception hook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestDetails {
    pub url: String,
    pub method: String,
    pub resource_type: ResourceType,
    /// Upload body, already flattened to text where the session could.
    pub body: Option<String>,
}

impl RequestDetails {
    pub fn get(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: "GET".to_string(),
            resource_type: ResourceType::Xhr,
            body: None,
        }
    }

    pub fn post(url: &str, body: &str) -> Self {
        Self {
            url: url.to_string(),
            method: "POST".to_string(),
            resource_type: ResourceType::Xhr,
            body: Some(body.to_string()),
        }
    }

    pub fn with_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = resource_type;
        self
    }

    /// True for socket upgrades, which are left to the page-side interceptor.
    pub fn is_socket(&self) -> bool {
        self.resource_type == ResourceType::WebSocket
            || self.url.starts_with("wss://")
            || self.url.starts_with("ws://")
    }
}

/// Answer returned to the embedding session's request hook.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FilterResponse {
    pub cancel: bool,
}

/// Running counters of what the suppression engine did.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SuppressionStats {
    pub requests_allowed: u64,
    pub loopback_probes_cancelled: u64,
    pub read_receipts_cancelled: u64,
    pub typing_requests_cancelled: u64,
    pub socket_typing_dropped: u64,
    pub socket_active_status_dropped: u64,
    pub socket_read_receipts_dropped: u64,
    /// Signal-carrying socket frames the flags let through.
    pub socket_signals_forwarded: u64,
}

impl SuppressionStats {
    pub fn requests_cancelled(&self) -> u64 {
        self.loopback_probes_cancelled + self.read_receipts_cancelled + self.typing_requests_cancelled
    }

    pub fn socket_frames_dropped(&self) -> u64 {
        self.socket_typing_dropped + self.socket_active_status_dropped + self.socket_read_receipts_dropped
    }

    /// Count one classified socket frame. Frames with no signal are not counted.
    pub fn record_socket(&mut self, kind: SignalKind, dropped: bool) {
        if !dropped {
            if kind.is_signal() {
                self.socket_signals_forwarded += 1;
            }
            return;
        }
        match kind {
            SignalKind::Typing => self.socket_typing_dropped += 1,
            SignalKind::ActiveStatus => self.socket_active_status_dropped += 1,
            SignalKind::ReadReceipt => self.socket_read_receipts_dropped += 1,
            SignalKind::None => {}
        }
    }

    /// Add another set of counters into this one.
    pub fn merge(&mut self, other: &SuppressionStats) {
        self.requests_allowed += other.requests_allowed;
        self.loopback_probes_cancelled += other.loopback_probes_cancelled;
        self.read_receipts_cancelled += other.read_receipts_cancelled;
        self.typing_requests_cancelled += other.typing_requests_cancelled;
        self.socket_typing_dropped += other.socket_typing_dropped;
        self.socket_active_status_dropped += other.socket_active_status_dropped;
        self.socket_read_receipts_dropped += other.socket_read_receipts_dropped;
        self.socket_signals_forwarded += other.socket_signals_forwarded;
    }
}
