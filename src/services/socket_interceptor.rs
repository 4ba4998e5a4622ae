//! Socket Frame Interceptor.
//!
//! Wraps the page's live-socket constructor so every outbound frame is
//! classified before it reaches the transport. The wrapper reads the flag
//! globals on each send rather than capturing them, because it is installed
//! once per document and flags change afterwards.
//!
//! [`InterceptedSocket`] is the native rendition of the injected wrapper; the
//! headless host builds page sockets through it. Real WebViews get the same
//! logic as JavaScript via [`PageScript::InstallSocketInterceptor`].

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::services::embedding::PageScript;
use crate::services::interceptor::Interceptor;
use crate::services::signal_classifier;
use crate::telemetry::{self, MAX_PAYLOAD_LOG};
use crate::types::errors::TransportError;
use crate::types::frame::PageGlobals;
use crate::types::signal::{InterceptionTarget, SignalKind, SocketPayload, SuppressionStats};

/// The four ready-state constants the wrapper preserves.
pub const CONNECTING: u16 = 0;
pub const OPEN: u16 = 1;
pub const CLOSING: u16 = 2;
pub const CLOSED: u16 = 3;

/// What happens to one outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketDecision {
    Forward,
    Drop,
}

/// Decision table for one outbound frame under `globals`.
pub fn decide(globals: &PageGlobals, payload: &SocketPayload) -> (SignalKind, SocketDecision) {
    let text = match signal_classifier::decode_payload(payload) {
        Some(t) => t,
        None => return (SignalKind::None, SocketDecision::Forward),
    };
    let kind = signal_classifier::classify_text_payload(text);
    let flags = &globals.flags;
    let drop = match kind {
        SignalKind::Typing => {
            flags.block_typing_indicator && !signal_classifier::payload_indicates_typing_stopped(text)
        }
        SignalKind::ActiveStatus => flags.block_active_status,
        SignalKind::ReadReceipt => flags.block_read_receipts,
        SignalKind::None => false,
    };
    let decision = if drop {
        SocketDecision::Drop
    } else {
        SocketDecision::Forward
    };
    (kind, decision)
}

/// The page's socket as seen by page scripts.
pub trait SocketTransport {
    fn url(&self) -> &str;
    fn ready_state(&self) -> u16;
    fn send(&mut self, payload: SocketPayload) -> Result<(), TransportError>;
}

impl SocketTransport for Box<dyn SocketTransport> {
    fn url(&self) -> &str {
        (**self).url()
    }

    fn ready_state(&self) -> u16 {
        (**self).ready_state()
    }

    fn send(&mut self, payload: SocketPayload) -> Result<(), TransportError> {
        (**self).send(payload)
    }
}

/// Frame-wide state a page-side wrapper reads: the flag globals and counters.
pub type SharedGlobals = Rc<RefCell<PageGlobals>>;
pub type SharedStats = Rc<RefCell<SuppressionStats>>;

/// Transparent wrapper around a page socket.
pub struct InterceptedSocket<T: SocketTransport> {
    inner: T,
    globals: SharedGlobals,
    stats: SharedStats,
}

impl<T: SocketTransport> InterceptedSocket<T> {
    pub fn new(inner: T, globals: SharedGlobals, stats: SharedStats) -> Self {
        Self {
            inner,
            globals,
            stats,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: SocketTransport> SocketTransport for InterceptedSocket<T> {
    fn url(&self) -> &str {
        self.inner.url()
    }

    fn ready_state(&self) -> u16 {
        self.inner.ready_state()
    }

    fn send(&mut self, payload: SocketPayload) -> Result<(), TransportError> {
        let globals = *self.globals.borrow();
        let (kind, decision) = decide(&globals, &payload);
        let blocked = decision == SocketDecision::Drop;

        if kind == SignalKind::Typing && globals.trace.trace_socket {
            if globals.trace.trace_payloads {
                let preview = signal_classifier::decode_payload(&payload).unwrap_or("");
                info!(
                    "[WS-TYPING] {} blocked={} {}",
                    self.inner.url(),
                    blocked,
                    telemetry::truncate(preview, MAX_PAYLOAD_LOG)
                );
            } else {
                info!("[WS-TYPING] {} blocked={}", self.inner.url(), blocked);
            }
        }

        self.stats.borrow_mut().record_socket(kind, blocked);
        if blocked {
            return Ok(());
        }
        self.inner.send(payload)
    }
}

/// Installs the socket wrapper into frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketFrameInterceptor;

impl Interceptor for SocketFrameInterceptor {
    fn target(&self) -> InterceptionTarget {
        InterceptionTarget::SocketFrame
    }

    fn install_script(&self) -> PageScript {
        PageScript::InstallSocketInterceptor
    }

    /// The wrapped constructor cannot be taken back out of a live page.
    fn uninstall_script(&self) -> Option<PageScript> {
        None
    }
}
