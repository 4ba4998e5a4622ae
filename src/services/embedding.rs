//! Embedding-session interface.
//!
//! The suppression engine never touches a WebView directly. It talks to an
//! [`EmbeddingSession`]: a request hook for outgoing traffic and a one-way
//! script channel into frames. Messages into the page are typed
//! [`PageScript`] values; real WebViews evaluate [`PageScript::source`], the
//! headless host applies them natively.

use std::sync::Arc;

use crate::services::request_filter::LOOPBACK_PROBE_PORT;
use crate::services::signal_classifier;
use crate::types::errors::InjectionError;
use crate::types::frame::{FrameId, PageGlobals};
use crate::types::signal::{FilterResponse, RequestDetails, SuppressionStats};

/// Request-interception callback installed on the session.
pub type RequestHandler = Arc<dyn Fn(&RequestDetails) -> FilterResponse + Send + Sync>;

const SOCKET_INTERCEPTOR_JS: &str = include_str!("../../resources/inject/socket_interceptor.js");
const VISIBILITY_OVERRIDE_JS: &str = include_str!("../../resources/inject/visibility_override.js");
const REQUEST_GUARD_JS: &str = include_str!("../../resources/inject/request_guard.js");
const FRAME_BRIDGE_JS: &str = include_str!("../../resources/inject/frame_bridge.js");

/// Placeholder in page scripts replaced with the classifier's keyword tables.
const RULES_PLACEHOLDER: &str = "__QS_RULES__";
const PROBE_PORT_PLACEHOLDER: &str = "__QS_PROBE_PORT__";
const BRIDGE_TOKEN_PLACEHOLDER: &str = "__QS_BRIDGE_TOKEN__";

/// Page-global names written by the flag synchronizer.
pub const GLOBAL_BLOCK_READ_RECEIPTS: &str = "__qsBlockReadReceipts";
pub const GLOBAL_BLOCK_TYPING: &str = "__qsBlockTypingIndicator";
pub const GLOBAL_BLOCK_ACTIVE_STATUS: &str = "__qsBlockActiveStatus";
pub const GLOBAL_DEBUG_TRACE: &str = "__qsDebugTrace";
pub const GLOBAL_TRACE_SOCKET: &str = "__qsTraceSocket";
pub const GLOBAL_TRACE_PAYLOADS: &str = "__qsTracePayloads";

/// Session-storage key holding the last synced flags, so a reloaded
/// document starts with them before it reports in.
pub const FLAG_STORAGE_KEY: &str = "__qsFlags";

/// Sentinel the socket interceptor leaves on the frame's global object.
pub const SOCKET_SENTINEL: &str = "__qsSocketPatched";

/// A one-way message from the privileged process into a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PageScript {
    /// Wrap the page's socket constructor. No-op if the sentinel is present.
    InstallSocketInterceptor,
    /// Overwrite the flag globals.
    SyncFlags(PageGlobals),
    /// Simulate a backgrounded, unfocused tab.
    ApplyVisibilityOverride,
    /// Put the original visibility descriptors back.
    RestoreVisibilityOverride,
}

impl PageScript {
    /// JavaScript equivalent, for hosts that evaluate source text.
    pub fn source(&self) -> String {
        match self {
            PageScript::InstallSocketInterceptor => socket_interceptor_source(),
            PageScript::SyncFlags(globals) => sync_flags_source(globals),
            PageScript::ApplyVisibilityOverride => {
                format!("{}\n;window.__qsVisibility.apply();", VISIBILITY_OVERRIDE_JS)
            }
            PageScript::RestoreVisibilityOverride => {
                "if(window.__qsVisibility){window.__qsVisibility.restore();}".to_string()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PageScript::InstallSocketInterceptor => "install-socket-interceptor",
            PageScript::SyncFlags(_) => "sync-flags",
            PageScript::ApplyVisibilityOverride => "apply-visibility-override",
            PageScript::RestoreVisibilityOverride => "restore-visibility-override",
        }
    }
}

fn rules_json() -> String {
    serde_json::to_string(&signal_classifier::payload_rules()).unwrap_or_else(|_| "{}".to_string())
}

/// The socket interceptor script with the keyword tables filled in.
pub fn socket_interceptor_source() -> String {
    SOCKET_INTERCEPTOR_JS.replace(RULES_PLACEHOLDER, &rules_json())
}

/// Page-side request guard for hosts whose request hook cannot call back
/// into the privileged side synchronously. Reads the same flag globals.
pub fn request_guard_source() -> String {
    REQUEST_GUARD_JS
        .replace(RULES_PLACEHOLDER, &rules_json())
        .replace(PROBE_PORT_PLACEHOLDER, &LOOPBACK_PROBE_PORT.to_string())
}

/// Frame identity and script relay. Only dispatches carrying `token` run.
pub fn frame_bridge_source(token: &str) -> String {
    FRAME_BRIDGE_JS.replace(BRIDGE_TOKEN_PLACEHOLDER, token)
}

fn globals_json(globals: &PageGlobals) -> String {
    let f = &globals.flags;
    let t = &globals.trace;
    serde_json::json!({
        GLOBAL_BLOCK_READ_RECEIPTS: f.block_read_receipts,
        GLOBAL_BLOCK_TYPING: f.block_typing_indicator,
        GLOBAL_BLOCK_ACTIVE_STATUS: f.block_active_status,
        GLOBAL_DEBUG_TRACE: t.debug_trace,
        GLOBAL_TRACE_SOCKET: t.trace_socket,
        GLOBAL_TRACE_PAYLOADS: t.trace_payloads,
    })
    .to_string()
}

fn sync_flags_source(globals: &PageGlobals) -> String {
    let f = &globals.flags;
    let t = &globals.trace;
    format!(
        "(function(w){{w.{}={};w.{}={};w.{}={};w.{}={};w.{}={};w.{}={};\
         try{{w.sessionStorage.setItem('{}','{}');}}catch(e){{}}}})(window);",
        GLOBAL_BLOCK_READ_RECEIPTS,
        f.block_read_receipts,
        GLOBAL_BLOCK_TYPING,
        f.block_typing_indicator,
        GLOBAL_BLOCK_ACTIVE_STATUS,
        f.block_active_status,
        GLOBAL_DEBUG_TRACE,
        t.debug_trace,
        GLOBAL_TRACE_SOCKET,
        t.trace_socket,
        GLOBAL_TRACE_PAYLOADS,
        t.trace_payloads,
        FLAG_STORAGE_KEY,
        globals_json(globals),
    )
}

/// Document-start script giving every new document its flag globals before
/// any page code runs: the flags last synced into this tab if session
/// storage has them, `globals` otherwise. Globals already set are left alone.
pub fn flag_seed_source(globals: &PageGlobals) -> String {
    format!(
        "(function(w){{var seed={};\
         try{{var s=w.sessionStorage.getItem('{}');if(s)seed=JSON.parse(s);}}catch(e){{}}\
         for(var k in seed){{if(w[k]===undefined)w[k]=!!seed[k];}}}})(window);",
        globals_json(globals),
        FLAG_STORAGE_KEY,
    )
}

/// What the engine needs from the browser surface hosting the page.
pub trait EmbeddingSession {
    /// Route requests whose URL matches any of `patterns` through `handler`.
    /// Replaces a previously installed hook.
    fn set_request_hook(&mut self, patterns: &[String], handler: RequestHandler);
    /// Remove the request hook entirely.
    fn clear_request_hook(&mut self);
    /// Fire-and-forget script delivery into one frame. May fail; callers ignore it.
    fn run_in_frame(&mut self, frame: FrameId, script: &PageScript) -> Result<(), InjectionError>;
    /// Full reload of the embedded page.
    fn reload(&mut self);
    /// Socket frames the host's pages have classified. Hosts whose pages
    /// report over IPC instead leave this at zero.
    fn socket_stats(&self) -> SuppressionStats {
        SuppressionStats::default()
    }
}
