use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one loaded document context (top-level or nested).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

impl FrameId {
    /// The top-level frame is always id 0.
    pub const MAIN: FrameId = FrameId(0);

    pub fn is_main(self) -> bool {
        self == Self::MAIN
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// The three suppression preferences. Independent of each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuppressionFlags {
    pub block_read_receipts: bool,
    pub block_typing_indicator: bool,
    pub block_active_status: bool,
}

impl SuppressionFlags {
    /// Whether the network request filter has anything to do.
    pub fn needs_request_filter(&self) -> bool {
        self.block_read_receipts || self.block_typing_indicator
    }

    /// Visibility is shared by two preferences, so this is an OR.
    pub fn needs_visibility_override(&self) -> bool {
        self.block_active_status || self.block_read_receipts
    }

    pub fn any(&self) -> bool {
        self.block_read_receipts || self.block_typing_indicator || self.block_active_status
    }
}

/// Observational switches. Never change what gets blocked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TraceFlags {
    /// Log every cancelled request.
    pub debug_trace: bool,
    /// Log every outbound typing-classified socket frame.
    pub trace_socket: bool,
    /// Include truncated payload previews in trace lines.
    pub trace_payloads: bool,
}

/// The globals the flag synchronizer writes into a frame.
///
/// Page-side wrappers read these on every event instead of capturing them at
/// install time, so a re-sync is enough for them to see new values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageGlobals {
    pub flags: SuppressionFlags,
    pub trace: TraceFlags,
}

impl PageGlobals {
    pub fn new(flags: SuppressionFlags, trace: TraceFlags) -> Self {
        Self { flags, trace }
    }
}
