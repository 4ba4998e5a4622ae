use std::cell::RefCell;
use std::rc::Rc;

use quietshell::app::App;
use quietshell::managers::frame_registry::{FrameRegistry, FrameRegistryTrait};
use quietshell::services::embedding::{EmbeddingSession, PageScript};
use quietshell::services::headless_page::{HeadlessSession, RecordingTransport};
use quietshell::services::interceptor::{InstallOutcome, Interceptor};
use quietshell::services::settings_engine::SettingsEngine;
use quietshell::services::socket_interceptor::*;
use quietshell::types::errors::TransportError;
use quietshell::types::frame::{FrameId, PageGlobals, SuppressionFlags, TraceFlags};
use quietshell::types::settings::Preference;
use quietshell::types::signal::{InterceptionTarget, SocketPayload, SuppressionStats};

const CHAT: &str = "wss://edge-chat.messenger.com/chat";

fn typing_globals() -> PageGlobals {
    PageGlobals::new(
        SuppressionFlags {
            block_read_receipts: false,
            block_typing_indicator: true,
            block_active_status: false,
        },
        TraceFlags::default(),
    )
}

fn wrapped(globals: PageGlobals) -> (InterceptedSocket<RecordingTransport>, Rc<RefCell<Vec<SocketPayload>>>, Rc<RefCell<SuppressionStats>>) {
    let transport = RecordingTransport::new(CHAT);
    let sent = transport.sent();
    let stats = Rc::new(RefCell::new(SuppressionStats::default()));
    let socket = InterceptedSocket::new(transport, Rc::new(RefCell::new(globals)), Rc::clone(&stats));
    (socket, sent, stats)
}

// === Wrapper behaviour ===

#[test]
fn wrapper_is_transparent() {
    let (socket, _, _) = wrapped(PageGlobals::default());
    assert_eq!(socket.url(), CHAT);
    assert_eq!(socket.ready_state(), OPEN);
    assert_eq!((CONNECTING, OPEN, CLOSING, CLOSED), (0, 1, 2, 3));
}

#[test]
fn typing_frame_dropped_stop_frame_forwarded() {
    let (mut socket, sent, stats) = wrapped(typing_globals());
    socket.send(SocketPayload::from("{\"is_typing\":true}")).unwrap();
    socket.send(SocketPayload::from("{\"is_typing\":false}")).unwrap();
    socket.send(SocketPayload::from("{\"text\":\"hi\"}")).unwrap();

    assert_eq!(
        *sent.borrow(),
        vec![
            SocketPayload::from("{\"is_typing\":false}"),
            SocketPayload::from("{\"text\":\"hi\"}"),
        ]
    );
    assert_eq!(stats.borrow().socket_typing_dropped, 1);
    assert_eq!(stats.borrow().socket_frames_dropped(), 1);
    // The stop frame carries a signal; plain chat text is not counted.
    assert_eq!(stats.borrow().socket_signals_forwarded, 1);
}

#[test]
fn flags_are_read_at_send_time() {
    let transport = RecordingTransport::new(CHAT);
    let sent = transport.sent();
    let globals = Rc::new(RefCell::new(PageGlobals::default()));
    let mut socket = InterceptedSocket::new(
        transport,
        Rc::clone(&globals),
        Rc::new(RefCell::new(SuppressionStats::default())),
    );

    socket.send(SocketPayload::from("{\"is_typing\":true}")).unwrap();
    *globals.borrow_mut() = typing_globals();
    socket.send(SocketPayload::from("{\"is_typing\":true}")).unwrap();
    assert_eq!(sent.borrow().len(), 1);
}

#[test]
fn transport_errors_pass_through() {
    let mut transport = RecordingTransport::new(CHAT);
    transport.close();
    let mut socket = InterceptedSocket::new(
        transport,
        Rc::new(RefCell::new(typing_globals())),
        Rc::new(RefCell::new(SuppressionStats::default())),
    );
    // Dropped frames never touch the transport, so no error.
    assert!(socket.send(SocketPayload::from("{\"is_typing\":true}")).is_ok());
    assert!(matches!(
        socket.send(SocketPayload::from("hello")),
        Err(TransportError::Closed)
    ));
}

#[test]
fn tracing_does_not_change_decisions() {
    let mut globals = typing_globals();
    globals.trace = TraceFlags {
        debug_trace: true,
        trace_socket: true,
        trace_payloads: true,
    };
    let (mut socket, sent, _) = wrapped(globals);
    socket.send(SocketPayload::from("{\"is_typing\":true}")).unwrap();
    assert!(sent.borrow().is_empty());
}

// === Installation ===

#[test]
fn installing_twice_leaves_one_wrapper() {
    let mut session = HeadlessSession::new();
    session.load_frame(FrameId::MAIN, "https://www.messenger.com/");
    session.run_in_frame(FrameId::MAIN, &PageScript::InstallSocketInterceptor).unwrap();
    session.run_in_frame(FrameId::MAIN, &PageScript::InstallSocketInterceptor).unwrap();
    session
        .run_in_frame(FrameId::MAIN, &PageScript::SyncFlags(PageGlobals::default()))
        .unwrap();

    let frame = session.frame(FrameId::MAIN).unwrap();
    assert_eq!(frame.socket_wraps(), 1);

    let mut socket = frame.open_socket(RecordingTransport::new(CHAT));
    socket.send(SocketPayload::from("{\"is_typing\":true}")).unwrap();
    // One classification per send, not one per install.
    assert_eq!(frame.socket_stats().socket_signals_forwarded, 1);
}

#[test]
fn registry_short_circuits_repeat_installs() {
    let mut session = HeadlessSession::new();
    let mut registry = FrameRegistry::new();
    let interceptor = SocketFrameInterceptor;
    session.load_frame(FrameId(4), "https://www.messenger.com/");
    registry.attach(FrameId(4), "https://www.messenger.com/", false);

    assert_eq!(interceptor.install(&mut session, &mut registry, FrameId(4)), InstallOutcome::Installed);
    assert_eq!(
        interceptor.install(&mut session, &mut registry, FrameId(4)),
        InstallOutcome::AlreadyInstalled
    );
    assert_eq!(session.frame(FrameId(4)).unwrap().scripts_run(), &["install-socket-interceptor"]);
    assert!(interceptor.is_installed(&registry, FrameId(4)));
    assert_eq!(interceptor.target(), InterceptionTarget::SocketFrame);
}

#[test]
fn install_into_unknown_or_denied_frame_is_swallowed() {
    let mut session = HeadlessSession::new();
    let mut registry = FrameRegistry::new();
    let interceptor = SocketFrameInterceptor;

    assert_eq!(
        interceptor.install(&mut session, &mut registry, FrameId(9)),
        InstallOutcome::NotDelivered
    );

    session.load_frame(FrameId(9), "https://ads.example.com/");
    registry.attach(FrameId(9), "https://ads.example.com/", false);
    session.deny_frame(FrameId(9));
    assert_eq!(
        interceptor.install(&mut session, &mut registry, FrameId(9)),
        InstallOutcome::NotDelivered
    );
    assert!(!interceptor.is_installed(&registry, FrameId(9)));
}

#[test]
fn unpatched_frame_sockets_are_untouched() {
    let mut session = HeadlessSession::new();
    session.load_frame(FrameId::MAIN, "https://www.messenger.com/");
    let transport = RecordingTransport::new(CHAT);
    let sent = transport.sent();
    let mut socket = session.frame(FrameId::MAIN).unwrap().open_socket(transport);
    socket.send(SocketPayload::from("{\"is_typing\":true}")).unwrap();
    assert_eq!(sent.borrow().len(), 1);
}

// === End to end ===

#[test]
fn scenario_typing_frames_never_reach_transport() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json").to_string_lossy().to_string();
    let mut app = App::with_settings(SettingsEngine::new(Some(path)).with_env_trace(TraceFlags::default()));
    let mut session = HeadlessSession::new();

    app.startup(&mut session);
    session.load_frame(FrameId::MAIN, "https://www.messenger.com/");
    app.on_frame_loaded(&mut session, FrameId::MAIN, "https://www.messenger.com/", true);
    app.set_preference(&mut session, Preference::BlockTypingIndicator, true).unwrap();

    let frame = session.frame(FrameId::MAIN).unwrap();
    assert!(frame.socket_patched());
    assert!(frame.globals().flags.block_typing_indicator);

    let transport = RecordingTransport::new(CHAT);
    let sent = transport.sent();
    let mut socket = frame.open_socket(transport);
    socket.send(SocketPayload::from("{\"is_typing\":true}")).unwrap();
    assert!(sent.borrow().is_empty());

    socket.send(SocketPayload::from("{\"is_typing\":false}")).unwrap();
    assert_eq!(*sent.borrow(), vec![SocketPayload::from("{\"is_typing\":false}")]);
}
