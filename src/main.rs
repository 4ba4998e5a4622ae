//! QuietShell: a desktop shell around a web messenger.
//!
//! Entry point: opens the WebView window. When built without the `gui`
//! feature, walks the suppression engine through its scenarios against the
//! headless page host instead.

#[cfg(feature = "gui")]
fn main() {
    quietshell::telemetry::init_tracing();
    if let Err(err) = quietshell::ui::webview_app::run() {
        eprintln!("QuietShell failed to start: {}", err);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "gui"))]
use quietshell::{
    app::App,
    services::headless_page::{HeadlessSession, RecordingTransport},
    services::settings_engine::SettingsEngine,
    services::socket_interceptor::SocketTransport,
    types::frame::{FrameId, TraceFlags},
    types::settings::Preference,
    types::signal::{RequestDetails, SocketPayload},
};

#[cfg(not(feature = "gui"))]
fn main() {
    quietshell::telemetry::init_tracing();

    println!();
    println!("QuietShell v{} (headless demo)", env!("CARGO_PKG_VERSION"));
    println!();

    let dir = std::env::temp_dir().join(format!("quietshell-demo-{}", std::process::id()));
    let config = dir.join("settings.json").to_string_lossy().to_string();
    let settings = SettingsEngine::new(Some(config)).with_env_trace(TraceFlags::default());
    let mut app = App::with_settings(settings);
    let mut session = HeadlessSession::with_document_start(app.document_seed());
    let home = app.home_url();

    app.startup(&mut session);
    session.load_frame(FrameId::MAIN, &home);
    app.on_frame_loaded(&mut session, FrameId::MAIN, &home, true);

    demo_filter_absent(&mut session);
    demo_typing_request(&mut app, &mut session);
    demo_typing_socket(&mut app, &mut session);
    demo_reload_policy(&mut app, &mut session, &home);

    let stats = app.stats(&session);
    println!();
    println!(
        "Requests: {} allowed, {} cancelled",
        stats.requests_allowed,
        stats.requests_cancelled()
    );
    println!(
        "Socket frames: {} dropped, {} signals forwarded",
        stats.socket_frames_dropped(),
        stats.socket_signals_forwarded
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(not(feature = "gui"))]
fn section(name: &str) {
    println!("--- {} ---", name);
}

#[cfg(not(feature = "gui"))]
fn demo_filter_absent(session: &mut HeadlessSession) {
    section("A: no flags, no filter");
    let url = "https://www.messenger.com/ajax/mercury/change_read_status.php";
    let response = session.send_request(RequestDetails::post(url, "ids[1]=true"));
    println!("  hook installed: {}", session.has_request_hook());
    println!("  read-receipt request cancelled: {}", response.cancel);
    println!();
}

#[cfg(not(feature = "gui"))]
fn demo_typing_request(app: &mut App, session: &mut HeadlessSession) {
    section("B: typing requests");
    if let Err(err) = app.set_preference(session, Preference::BlockTypingIndicator, true) {
        println!("  toggle failed: {}", err);
        return;
    }
    let typing = session.send_request(RequestDetails::post(
        "https://www.messenger.com/ajax/messaging/typ.php",
        "is_typing=true",
    ));
    let unrelated = session.send_request(RequestDetails::post(
        "https://www.messenger.com/api/graphql/",
        "doc_id=1&variables={\"message\":\"hello\"}",
    ));
    println!("  typing endpoint cancelled: {}", typing.cancel);
    println!("  unrelated request cancelled: {}", unrelated.cancel);
    println!();
}

#[cfg(not(feature = "gui"))]
fn demo_typing_socket(app: &mut App, session: &mut HeadlessSession) {
    section("C: typing socket frames");
    let transport = RecordingTransport::new("wss://edge-chat.messenger.com/chat");
    let sent = transport.sent();
    let mut socket = match session.frame(FrameId::MAIN) {
        Some(frame) => frame.open_socket(transport),
        None => return,
    };
    let _ = socket.send(SocketPayload::from("{\"is_typing\":true}"));
    let _ = socket.send(SocketPayload::from("{\"is_typing\":false}"));
    println!(
        "  frames reaching the transport: {} of 2",
        sent.borrow().len()
    );
    println!(
        "  typing still blocked: {}",
        app.settings_engine.get_bool(Preference::BlockTypingIndicator)
    );
    println!();
}

#[cfg(not(feature = "gui"))]
fn demo_reload_policy(app: &mut App, session: &mut HeadlessSession, home: &str) {
    section("D: reload policy");
    let before = session.reload_count();
    let _ = app.toggle_preference(session, Preference::DebugTrace);
    println!("  reloads after debugTrace toggle: {}", session.reload_count() - before);

    let _ = app.set_preference(session, Preference::BlockReadReceipts, true);
    let _ = app.set_preference(session, Preference::BlockReadReceipts, false);
    println!("  reloads after disabling blockReadReceipts: {}", session.reload_count() - before);

    for (frame, url, top) in session.take_pending_loads() {
        app.on_frame_loaded(session, frame, &url, top);
    }
    let patched = session
        .frame(FrameId::MAIN)
        .map(|f| f.socket_patched())
        .unwrap_or(false);
    println!("  main frame re-patched after reload: {} ({})", patched, home);
}
