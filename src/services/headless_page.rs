//! Headless page host.
//!
//! An [`EmbeddingSession`] without a browser: each frame is a small native
//! model of the page context (flag globals, the socket constructor, the
//! document's visibility surface) and page scripts are applied directly
//! instead of evaluated. Used by the console demo and the end-to-end tests.

use std::cell::RefCell;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::services::embedding::{EmbeddingSession, PageScript, RequestHandler};
use crate::services::request_filter::UrlPattern;
use crate::services::socket_interceptor::{
    InterceptedSocket, SharedGlobals, SharedStats, SocketTransport, CLOSED, OPEN,
};
use crate::services::visibility_override::DocumentVisibility;
use crate::types::errors::{InjectionError, TransportError};
use crate::types::frame::{FrameId, PageGlobals};
use crate::types::signal::{FilterResponse, RequestDetails, SocketPayload, SuppressionStats};

/// A socket that records what reached the wire.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    url: String,
    open: bool,
    sent: Rc<RefCell<Vec<SocketPayload>>>,
}

impl RecordingTransport {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            open: true,
            sent: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Shared view of the frames sent so far; stays valid after the
    /// transport is moved into a page socket.
    pub fn sent(&self) -> Rc<RefCell<Vec<SocketPayload>>> {
        Rc::clone(&self.sent)
    }

    pub fn close(&mut self) {
        self.open = false;
    }
}

impl SocketTransport for RecordingTransport {
    fn url(&self) -> &str {
        &self.url
    }

    fn ready_state(&self) -> u16 {
        if self.open {
            OPEN
        } else {
            CLOSED
        }
    }

    fn send(&mut self, payload: SocketPayload) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        self.sent.borrow_mut().push(payload);
        Ok(())
    }
}

/// Native stand-in for one frame's page context.
pub struct HeadlessFrame {
    pub url: String,
    pub is_main: bool,
    globals: SharedGlobals,
    stats: SharedStats,
    /// How many times the socket constructor has been wrapped.
    socket_wraps: u32,
    pub visibility: DocumentVisibility,
    scripts_run: Vec<&'static str>,
}

impl HeadlessFrame {
    /// A fresh document. `start` is what the document-start scripts leave
    /// behind: seeded flag globals and an already wrapped socket constructor.
    fn new(url: &str, is_main: bool, stats: SharedStats, start: Option<PageGlobals>) -> Self {
        Self {
            url: url.to_string(),
            is_main,
            globals: Rc::new(RefCell::new(start.unwrap_or_default())),
            stats,
            socket_wraps: u32::from(start.is_some()),
            visibility: DocumentVisibility::foreground(),
            scripts_run: Vec::new(),
        }
    }

    pub fn globals(&self) -> PageGlobals {
        *self.globals.borrow()
    }

    /// The sentinel the socket interceptor leaves behind.
    pub fn socket_patched(&self) -> bool {
        self.socket_wraps > 0
    }

    pub fn socket_wraps(&self) -> u32 {
        self.socket_wraps
    }

    /// Socket counters of the whole session; they outlive reloads.
    pub fn socket_stats(&self) -> SuppressionStats {
        *self.stats.borrow()
    }

    /// Names of page scripts this document received, in order.
    pub fn scripts_run(&self) -> &[&'static str] {
        &self.scripts_run
    }

    fn apply(&mut self, script: &PageScript) {
        self.scripts_run.push(script.name());
        match script {
            PageScript::InstallSocketInterceptor => {
                if self.socket_wraps == 0 {
                    self.socket_wraps = 1;
                }
            }
            PageScript::SyncFlags(globals) => {
                *self.globals.borrow_mut() = *globals;
            }
            PageScript::ApplyVisibilityOverride => {
                let outcome = self.visibility.apply();
                debug!(url = %self.url, ?outcome, "visibility override");
            }
            PageScript::RestoreVisibilityOverride => {
                let outcome = self.visibility.restore();
                debug!(url = %self.url, ?outcome, "visibility restore");
            }
        }
    }

    /// `new WebSocket(url)` as the page would call it, through whatever
    /// constructor the page currently has.
    pub fn open_socket<T: SocketTransport + 'static>(&self, transport: T) -> Box<dyn SocketTransport> {
        let mut socket: Box<dyn SocketTransport> = Box::new(transport);
        for _ in 0..self.socket_wraps {
            socket = Box::new(InterceptedSocket::new(
                socket,
                Rc::clone(&self.globals),
                Rc::clone(&self.stats),
            ));
        }
        socket
    }
}

struct RequestHook {
    patterns: Vec<UrlPattern>,
    handler: RequestHandler,
}

/// An embedding session with no browser behind it.
pub struct HeadlessSession {
    frames: BTreeMap<FrameId, HeadlessFrame>,
    hook: Option<RequestHook>,
    denied: HashSet<FrameId>,
    reloads: u32,
    pending_loads: Vec<(FrameId, String, bool)>,
    forwarded: Vec<RequestDetails>,
    cancelled: Vec<RequestDetails>,
    stats: SharedStats,
    /// Flags baked into the document-start seed script, if the host runs one.
    document_seed: Option<PageGlobals>,
    /// Last synced flags per origin, as the tab's session storage holds them.
    stored_flags: BTreeMap<String, PageGlobals>,
}

fn origin_of(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => url.to_string(),
    }
}

impl HeadlessSession {
    pub fn new() -> Self {
        Self {
            frames: BTreeMap::new(),
            hook: None,
            denied: HashSet::new(),
            reloads: 0,
            pending_loads: Vec::new(),
            forwarded: Vec::new(),
            cancelled: Vec::new(),
            stats: Rc::new(RefCell::new(SuppressionStats::default())),
            document_seed: None,
            stored_flags: BTreeMap::new(),
        }
    }

    /// A session whose documents run the interceptor and the flag seed at
    /// document start, the way the WebView host registers them.
    pub fn with_document_start(seed: PageGlobals) -> Self {
        Self {
            document_seed: Some(seed),
            ..Self::new()
        }
    }

    fn new_document(&self, url: &str, is_main: bool) -> HeadlessFrame {
        let start = self
            .document_seed
            .map(|seed| self.stored_flags.get(&origin_of(url)).copied().unwrap_or(seed));
        HeadlessFrame::new(url, is_main, Rc::clone(&self.stats), start)
    }

    /// Start a fresh document in `frame`. Any previous document is discarded.
    pub fn load_frame(&mut self, frame: FrameId, url: &str) -> &mut HeadlessFrame {
        let document = self.new_document(url, frame.is_main());
        match self.frames.entry(frame) {
            Entry::Occupied(mut slot) => {
                slot.insert(document);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(document),
        }
    }

    pub fn detach_frame(&mut self, frame: FrameId) -> bool {
        self.frames.remove(&frame).is_some()
    }

    pub fn frame(&self, frame: FrameId) -> Option<&HeadlessFrame> {
        self.frames.get(&frame)
    }

    pub fn frame_mut(&mut self, frame: FrameId) -> Option<&mut HeadlessFrame> {
        self.frames.get_mut(&frame)
    }

    /// Make script injection into `frame` fail, as a sandboxed frame would.
    pub fn deny_frame(&mut self, frame: FrameId) {
        self.denied.insert(frame);
    }

    pub fn has_request_hook(&self) -> bool {
        self.hook.is_some()
    }

    pub fn reload_count(&self) -> u32 {
        self.reloads
    }

    /// Frame loads caused by reloads that the host has not reported yet.
    pub fn take_pending_loads(&mut self) -> Vec<(FrameId, String, bool)> {
        std::mem::take(&mut self.pending_loads)
    }

    pub fn forwarded_requests(&self) -> &[RequestDetails] {
        &self.forwarded
    }

    pub fn cancelled_requests(&self) -> &[RequestDetails] {
        &self.cancelled
    }

    /// Dispatch an outgoing request through the hook, if it matches.
    pub fn send_request(&mut self, details: RequestDetails) -> FilterResponse {
        let response = match &self.hook {
            Some(hook) if hook.patterns.iter().any(|p| p.matches_str(&details.url)) => {
                (hook.handler)(&details)
            }
            _ => FilterResponse::default(),
        };
        if response.cancel {
            self.cancelled.push(details);
        } else {
            self.forwarded.push(details);
        }
        response
    }
}

impl Default for HeadlessSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingSession for HeadlessSession {
    fn set_request_hook(&mut self, patterns: &[String], handler: RequestHandler) {
        let patterns = patterns
            .iter()
            .filter_map(|p| UrlPattern::parse(p))
            .collect();
        self.hook = Some(RequestHook { patterns, handler });
    }

    fn clear_request_hook(&mut self) {
        self.hook = None;
    }

    fn run_in_frame(&mut self, frame: FrameId, script: &PageScript) -> Result<(), InjectionError> {
        if self.denied.contains(&frame) {
            return Err(InjectionError::PermissionDenied(format!("{} is sandboxed", frame)));
        }
        let target = self
            .frames
            .get_mut(&frame)
            .ok_or(InjectionError::FrameDetached(frame))?;
        target.apply(script);
        if let PageScript::SyncFlags(globals) = script {
            self.stored_flags.insert(origin_of(&target.url), *globals);
        }
        Ok(())
    }

    fn reload(&mut self) {
        self.reloads += 1;
        let previous: Vec<(FrameId, String, bool)> = self
            .frames
            .iter()
            .map(|(id, f)| (*id, f.url.clone(), f.is_main))
            .collect();
        self.frames.clear();
        for (id, url, is_main) in previous {
            let document = self.new_document(&url, is_main);
            self.frames.insert(id, document);
            self.pending_loads.push((id, url, is_main));
        }
    }

    fn socket_stats(&self) -> SuppressionStats {
        *self.stats.borrow()
    }
}
