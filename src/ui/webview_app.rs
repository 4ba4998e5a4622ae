//! WebView host using `wry` + `tao`.
//!
//! Architecture:
//! - The flag seed, frame bridge, socket interceptor and request guard go in
//!   through `with_initialization_script`, so they run in every frame before
//!   the page's own bootstrap scripts. The seed sets the flag globals from
//!   the tab's session storage, or from the flags stored at startup.
//! - Frames report `frame_loaded` / `frame_detached` over `window.ipc`;
//!   IPC bodies are forwarded to the event loop and dispatched by
//!   [`crate::ipc_handler`] with a [`WebViewSession`] borrowed from the
//!   live WebView.
//! - The request hook cannot be called synchronously from page scripts, so
//!   sub-resource requests are judged by the injected guard and top-level
//!   navigations by the navigation handler.
//! - The settings page is served via the `qs://` custom protocol.

use std::borrow::Cow;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tao::window::WindowBuilder;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wry::{WebContext, WebView, WebViewBuilder};

use crate::app::App;
use crate::ipc_handler;
use crate::platform;
use crate::services::embedding::{self, EmbeddingSession, PageScript, RequestHandler};
use crate::services::request_filter::UrlPattern;
use crate::telemetry::{self, MAX_URL_LOG};
use crate::types::errors::InjectionError;
use crate::types::frame::FrameId;
use crate::types::signal::{RequestDetails, ResourceType};

const SETTINGS_HTML: &str = include_str!("../../resources/ui/settings.html");
const SETTINGS_URL: &str = "qs://localhost/settings";

#[derive(Debug)]
enum UserEvent {
    Ipc(String),
}

struct NavigationHook {
    patterns: Vec<UrlPattern>,
    handler: RequestHandler,
}

type SharedHook = Arc<Mutex<Option<NavigationHook>>>;

/// Decide a top-level navigation against the installed hook.
fn allow_navigation(hook: &SharedHook, url: &str) -> bool {
    let guard = match hook.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    };
    match guard.as_ref() {
        Some(h) if h.patterns.iter().any(|p| p.matches_str(url)) => {
            let details = RequestDetails::get(url).with_resource_type(ResourceType::MainFrame);
            !(h.handler)(&details).cancel
        }
        _ => true,
    }
}

/// [`EmbeddingSession`] over a live WebView.
pub struct WebViewSession<'a> {
    webview: &'a WebView,
    hook: SharedHook,
    bridge_token: &'a str,
}

impl<'a> WebViewSession<'a> {
    fn new(webview: &'a WebView, hook: SharedHook, bridge_token: &'a str) -> Self {
        Self {
            webview,
            hook,
            bridge_token,
        }
    }

    /// Script that runs `source` in `frame`: directly in the top frame,
    /// relayed through the frame bridge otherwise.
    fn targeted(&self, frame: FrameId, source: String) -> String {
        if frame.is_main() {
            return source;
        }
        format!(
            "window.__qsDispatch&&window.__qsDispatch({},{},{});",
            json!(self.bridge_token),
            frame.0,
            json!(source)
        )
    }
}

impl EmbeddingSession for WebViewSession<'_> {
    fn set_request_hook(&mut self, patterns: &[String], handler: RequestHandler) {
        let patterns = patterns.iter().filter_map(|p| UrlPattern::parse(p)).collect();
        if let Ok(mut slot) = self.hook.lock() {
            *slot = Some(NavigationHook { patterns, handler });
        }
    }

    fn clear_request_hook(&mut self) {
        if let Ok(mut slot) = self.hook.lock() {
            *slot = None;
        }
    }

    fn run_in_frame(&mut self, frame: FrameId, script: &PageScript) -> Result<(), InjectionError> {
        let js = self.targeted(frame, script.source());
        self.webview
            .evaluate_script(&js)
            .map_err(|e| InjectionError::ScriptFailed(e.to_string()))
    }

    fn reload(&mut self) {
        if let Err(err) = self.webview.reload() {
            warn!(%err, "reload failed");
        }
    }
}

/// Host-only commands that steer the WebView itself.
fn handle_host_command(webview: &WebView, app: &App, cmd: &str) -> bool {
    let target = match cmd {
        "open_settings" => SETTINGS_URL.to_string(),
        "open_home" => app.home_url(),
        _ => return false,
    };
    if let Err(err) = webview.load_url(&target) {
        warn!(%err, url = %target, "load failed");
    }
    true
}

fn dispatch_ipc(webview: &WebView, app: &mut App, hook: &SharedHook, token: &str, body: &str) {
    debug!("[IPC] {}", telemetry::truncate(body, MAX_URL_LOG));
    let cmd = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("cmd").and_then(|c| c.as_str()).map(str::to_string))
        .unwrap_or_default();
    if handle_host_command(webview, app, &cmd) {
        return;
    }
    let mut session = WebViewSession::new(webview, Arc::clone(hook), token);
    match ipc_handler::handle_raw(app, &mut session, body) {
        Ok(value) => {
            let reply = format!("window.__qsReply&&window.__qsReply({},{});", json!(cmd), value);
            let _ = webview.evaluate_script(&reply);
        }
        Err(err) => debug!(%err, "IPC rejected"),
    }
}

// ─── Main entry point ───

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(None);
    let home = app.home_url();
    let bridge_token = Uuid::new_v4().to_string();
    let hook: SharedHook = Arc::new(Mutex::new(None));

    let event_loop: EventLoop<UserEvent> = EventLoopBuilder::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let window = WindowBuilder::new()
        .with_title("QuietShell")
        .with_inner_size(tao::dpi::LogicalSize::new(1100.0, 780.0))
        .build(&event_loop)?;

    let mut web_context = WebContext::new(Some(platform::get_webview_data_dir()));
    let nav_hook = Arc::clone(&hook);

    let builder = WebViewBuilder::new_with_web_context(&mut web_context)
        .with_custom_protocol("qs".into(), move |_wv_id, request| {
            let body: &'static [u8] = match request.uri().path() {
                "/" | "/settings" => SETTINGS_HTML.as_bytes(),
                _ => b"",
            };
            wry::http::Response::builder()
                .header("Content-Type", "text/html; charset=utf-8")
                .body(Cow::Borrowed(body))
                .unwrap_or_else(|_| wry::http::Response::new(Cow::Borrowed(&[][..])))
        })
        .with_initialization_script(&embedding::flag_seed_source(&app.document_seed()))
        .with_initialization_script(&embedding::frame_bridge_source(&bridge_token))
        .with_initialization_script(&embedding::socket_interceptor_source())
        .with_initialization_script(&embedding::request_guard_source())
        .with_url(&home)
        .with_ipc_handler(move |msg: wry::http::Request<String>| {
            let _ = proxy.send_event(UserEvent::Ipc(msg.body().clone()));
        })
        .with_navigation_handler(move |url: String| {
            let allowed = allow_navigation(&nav_hook, &url);
            if !allowed {
                debug!("[NAV] refused {}", telemetry::truncate(&url, MAX_URL_LOG));
            }
            allowed
        })
        .with_devtools(cfg!(debug_assertions));

    #[cfg(target_os = "linux")]
    let webview = {
        use tao::platform::unix::WindowExtUnix;
        use wry::WebViewBuilderExtUnix;
        let vbox = window.default_vbox().ok_or("no GTK container for the WebView")?;
        builder.build_gtk(vbox)?
    };

    #[cfg(not(target_os = "linux"))]
    let webview = builder.build(&window)?;

    {
        let mut session = WebViewSession::new(&webview, Arc::clone(&hook), &bridge_token);
        app.startup(&mut session);
    }
    info!(url = %home, "QuietShell window ready");

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        // Keeps the profile directory alive with the WebView.
        let _ = &web_context;

        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                app.shutdown();
                *control_flow = ControlFlow::Exit;
            }

            Event::UserEvent(UserEvent::Ipc(body)) => {
                dispatch_ipc(&webview, &mut app, &hook, &bridge_token, &body);
            }

            _ => {}
        }
    });
}
