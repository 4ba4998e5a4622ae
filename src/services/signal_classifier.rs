//! Signal Classifier.
//!
//! Pure pattern matching that decides whether a URL, a request body or a raw
//! socket payload carries a read receipt, a typing indicator or an
//! active-status update. The remote protocol is undocumented, so everything
//! here is substring matching on curated lists. URL patterns win over body
//! inspection; body inspection for typing ends in a deliberately loose
//! heuristic (see [`body_has_typing_heuristic`]).

use serde::Serialize;

use crate::types::signal::{SignalKind, SocketPayload};

/// URL fragments of read-receipt endpoints, current and legacy.
pub const READ_RECEIPT_URL_PATTERNS: &[&str] = &[
    "/ajax/mercury/change_read_status.php",
    "/ajax/mercury/mark_seen.php",
    "/ajax/mercury/mark_folder_as_read",
    "change_read_status",
    "mark_seen",
    "/messaging/mark_read",
    "/messaging/read_receipt",
    "markthreadasread",
];

/// URL fragments of typing-indicator endpoints. The real-time host pattern
/// catches the long-poll transport, which carries typing state over plain HTTP.
pub const TYPING_URL_PATTERNS: &[&str] = &[
    "/ajax/messaging/typ.php",
    "/ajax/mercury/typ.php",
    "/messaging/typing",
    "typing_indicator",
    "sendtypingindicator",
    "edge-chat.",
];

/// Body keywords that name the act of marking something read or seen.
pub const MARK_READ_KEYWORDS: &[&str] = &[
    "mark_read",
    "markread",
    "mark_seen",
    "markseen",
    "mark_as_read",
    "markasread",
    "mark_thread_read",
    "markthreadread",
    "read_receipt",
    "readreceipt",
];

/// Context that must accompany a mark-read keyword in a request body.
pub const READ_CONTEXT_KEYWORDS: &[&str] = &["mutation", "graphql", "thread"];

/// Field and mutation names that identify a typing update.
pub const TYPING_FIELD_KEYWORDS: &[&str] = &[
    "is_typing",
    "istyping",
    "typing_indicator",
    "typingindicator",
    "send_typing",
    "sendtyping",
    "typing_state",
];

/// Values that make the typing heuristic fire.
pub const TRUTHY_MARKERS: &[&str] = &["true", "=1", ":1", "\"1\""];

/// Socket-layer keywords for presence / active status.
pub const ACTIVE_STATUS_KEYWORDS: &[&str] = &[
    "active_status",
    "activestatus",
    "last_active",
    "foreground_state",
    "make_user_available",
];

/// Values that mean "stopped typing" in a socket frame.
pub const TYPING_STOPPED_MARKERS: &[&str] = &[
    "\"is_typing\":false",
    "\"is_typing\":0",
    "is_typing=false",
    "is_typing=0",
    "\"state\":0",
];

/// The keyword tables, serialised for page-side scripts so both sides match
/// on the same lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadRules {
    pub typing: &'static [&'static str],
    pub typing_stopped: &'static [&'static str],
    pub active_status: &'static [&'static str],
    pub mark_read: &'static [&'static str],
    pub read_receipt_urls: &'static [&'static str],
    pub typing_urls: &'static [&'static str],
    pub read_context: &'static [&'static str],
    pub truthy: &'static [&'static str],
}

pub fn payload_rules() -> PayloadRules {
    PayloadRules {
        typing: TYPING_FIELD_KEYWORDS,
        typing_stopped: TYPING_STOPPED_MARKERS,
        active_status: ACTIVE_STATUS_KEYWORDS,
        mark_read: MARK_READ_KEYWORDS,
        read_receipt_urls: READ_RECEIPT_URL_PATTERNS,
        typing_urls: TYPING_URL_PATTERNS,
        read_context: READ_CONTEXT_KEYWORDS,
        truthy: TRUTHY_MARKERS,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

pub fn is_read_receipt_url(url: &str) -> bool {
    contains_any(&url.to_lowercase(), READ_RECEIPT_URL_PATTERNS)
}

pub fn is_typing_url(url: &str) -> bool {
    contains_any(&url.to_lowercase(), TYPING_URL_PATTERNS)
}

/// A mark-read keyword AND a mutation/graphql/thread keyword.
pub fn body_is_read_receipt(body: &str) -> bool {
    let lower = body.to_lowercase();
    contains_any(&lower, MARK_READ_KEYWORDS) && contains_any(&lower, READ_CONTEXT_KEYWORDS)
}

/// Which tier of the body check recognised a typing update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingMatch {
    /// A known typing field assigned a truthy value.
    Field,
    /// Only the loose "typing" + truthy fallback fired.
    Heuristic,
}

/// The value right after a field name: skips the closing quote, then `:` or
/// `=`, then an opening quote.
fn field_value_is_truthy(rest: &str) -> bool {
    let rest = rest.trim_start_matches('"').trim_start();
    let rest = match rest.strip_prefix(':').or_else(|| rest.strip_prefix('=')) {
        Some(r) => r.trim_start().trim_start_matches('"'),
        None => return false,
    };
    if rest.starts_with("true") {
        return true;
    }
    match rest.strip_prefix('1') {
        Some(tail) => !tail.starts_with(|c: char| c.is_ascii_digit()),
        None => false,
    }
}

/// A known typing field assigned a truthy value, as in `is_typing=1`,
/// `"is_typing":true` or `"typing_state": "1"`.
pub fn body_has_typing_field(body: &str) -> bool {
    let lower = body.to_lowercase();
    TYPING_FIELD_KEYWORDS.iter().any(|field| {
        lower
            .match_indices(field)
            .any(|(idx, _)| field_value_is_truthy(&lower[idx + field.len()..]))
    })
}

/// Structural tier first, heuristic second.
pub fn typing_body_match(body: &str) -> Option<TypingMatch> {
    if body_has_typing_field(body) {
        Some(TypingMatch::Field)
    } else if body_has_typing_heuristic(body) {
        Some(TypingMatch::Heuristic)
    } else {
        None
    }
}

pub fn body_is_typing(body: &str) -> bool {
    typing_body_match(body).is_some()
}

/// Last-resort typing check: the word "typing" plus any truthy marker.
///
/// Known false-positive source. A message that says "typing" and contains
/// "true" anywhere will match. Kept because the wire format has no stable
/// structure to parse instead.
pub fn body_has_typing_heuristic(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("typing") && contains_any(&lower, TRUTHY_MARKERS)
}

/// Classify an outgoing HTTP request. URL patterns first, then the body.
pub fn classify_request(url: &str, body: Option<&str>) -> SignalKind {
    if is_read_receipt_url(url) {
        return SignalKind::ReadReceipt;
    }
    if is_typing_url(url) {
        return SignalKind::Typing;
    }
    let body = match body {
        Some(b) if !b.is_empty() => b,
        _ => return SignalKind::None,
    };
    if body_is_read_receipt(body) {
        return SignalKind::ReadReceipt;
    }
    if body_is_typing(body) {
        return SignalKind::Typing;
    }
    SignalKind::None
}

/// Best-effort UTF-8 view of a socket payload. `None` when binary data does
/// not decode.
pub fn decode_payload(payload: &SocketPayload) -> Option<&str> {
    match payload {
        SocketPayload::Text(s) => Some(s.as_str()),
        SocketPayload::Binary(bytes) => std::str::from_utf8(bytes).ok(),
    }
}

/// Classify an already-decoded socket payload.
///
/// Precedence is typing, then active status, then read receipt, matching the
/// order of the socket decision table.
pub fn classify_text_payload(text: &str) -> SignalKind {
    let lower = text.to_lowercase();
    if contains_any(&lower, TYPING_FIELD_KEYWORDS) {
        return SignalKind::Typing;
    }
    if contains_any(&lower, ACTIVE_STATUS_KEYWORDS)
        || (lower.contains("presence") && lower.contains("active"))
    {
        return SignalKind::ActiveStatus;
    }
    if contains_any(&lower, MARK_READ_KEYWORDS) {
        return SignalKind::ReadReceipt;
    }
    SignalKind::None
}

/// Classify a raw socket payload. Undecodable binary is `None` (fail open).
pub fn classify_payload(payload: &SocketPayload) -> SignalKind {
    match decode_payload(payload) {
        Some(text) => classify_text_payload(text),
        None => SignalKind::None,
    }
}

/// True when a typing-classified frame announces that typing stopped.
/// Those frames are harmless and always forwarded.
pub fn payload_indicates_typing_stopped(text: &str) -> bool {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    contains_any(&compact, TYPING_STOPPED_MARKERS)
}
