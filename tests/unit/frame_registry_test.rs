use quietshell::app::App;
use quietshell::managers::frame_registry::{FrameRegistry, FrameRegistryTrait};
use quietshell::services::flag_sync::FlagSynchronizer;
use quietshell::services::headless_page::HeadlessSession;
use quietshell::services::settings_engine::SettingsEngine;
use quietshell::types::frame::{FrameId, PageGlobals, SuppressionFlags, TraceFlags};
use quietshell::types::signal::InterceptionTarget;

const HOME: &str = "https://www.messenger.com/";

fn blocking_all() -> PageGlobals {
    PageGlobals::new(
        SuppressionFlags {
            block_read_receipts: true,
            block_typing_indicator: true,
            block_active_status: true,
        },
        TraceFlags::default(),
    )
}

// === Registry ===

#[test]
fn frame_ids_are_ordered_main_first() {
    let mut reg = FrameRegistry::new();
    reg.attach(FrameId(12), "https://www.messenger.com/b", false);
    reg.attach(FrameId(5), "https://www.messenger.com/a", false);
    reg.attach(FrameId::MAIN, HOME, true);
    assert_eq!(reg.frame_ids(), vec![FrameId::MAIN, FrameId(5), FrameId(12)]);
    assert_eq!(reg.len(), 3);
}

#[test]
fn detach_invalidates_frame() {
    let mut reg = FrameRegistry::new();
    reg.attach(FrameId(2), HOME, false);
    let record = reg.detach(FrameId(2)).unwrap();
    assert_eq!(record.id, FrameId(2));
    assert!(!reg.is_attached(FrameId(2)));
    assert!(reg.detach(FrameId(2)).is_none());
    assert!(!reg.mark_installed(FrameId(2), InterceptionTarget::SocketFrame));
}

#[test]
fn frames_with_filters_by_target() {
    let mut reg = FrameRegistry::new();
    reg.attach(FrameId::MAIN, HOME, true);
    reg.attach(FrameId(1), HOME, false);
    assert!(reg.mark_installed(FrameId(1), InterceptionTarget::VisibilityApi));
    assert!(!reg.mark_installed(FrameId(1), InterceptionTarget::VisibilityApi));
    assert_eq!(reg.frames_with(InterceptionTarget::VisibilityApi), vec![FrameId(1)]);
    assert!(reg.frames_with(InterceptionTarget::SocketFrame).is_empty());
}

#[test]
fn clear_empties_registry() {
    let mut reg = FrameRegistry::default();
    reg.attach(FrameId::MAIN, HOME, true);
    reg.clear();
    assert!(reg.is_empty());
}

#[test]
fn main_frame_display() {
    assert!(FrameId::MAIN.is_main());
    assert!(!FrameId(3).is_main());
    assert_eq!(FrameId(3).to_string(), "frame#3");
}

// === Flag sync ===

#[test]
fn sync_all_reaches_every_live_frame() {
    let mut session = HeadlessSession::new();
    let mut reg = FrameRegistry::new();
    for id in [FrameId::MAIN, FrameId(1), FrameId(2)] {
        session.load_frame(id, HOME);
        reg.attach(id, HOME, id.is_main());
    }
    let delivered = FlagSynchronizer::new().sync_all(&mut session, &mut reg, blocking_all());
    assert_eq!(delivered, 3);
    for id in reg.frame_ids() {
        assert_eq!(session.frame(id).unwrap().globals(), blocking_all());
        assert_eq!(reg.get(id).unwrap().synced, Some(blocking_all()));
    }
}

#[test]
fn sync_skips_failed_frames_silently() {
    let mut session = HeadlessSession::new();
    let mut reg = FrameRegistry::new();
    session.load_frame(FrameId::MAIN, HOME);
    reg.attach(FrameId::MAIN, HOME, true);
    // Registered but the document is already gone host-side.
    reg.attach(FrameId(4), HOME, false);
    session.load_frame(FrameId(5), HOME);
    reg.attach(FrameId(5), HOME, false);
    session.deny_frame(FrameId(5));

    let delivered = FlagSynchronizer::new().sync_all(&mut session, &mut reg, blocking_all());
    assert_eq!(delivered, 1);
    assert_eq!(reg.get(FrameId(4)).unwrap().synced, None);
    assert_eq!(reg.get(FrameId(5)).unwrap().synced, None);
}

#[test]
fn sync_into_detached_frame_is_noop() {
    let mut session = HeadlessSession::new();
    let mut reg = FrameRegistry::new();
    session.load_frame(FrameId(3), HOME);
    reg.attach(FrameId(3), HOME, false);
    reg.detach(FrameId(3));

    assert!(!FlagSynchronizer::new().sync(&mut session, &mut reg, FrameId(3), blocking_all()));
    assert_eq!(session.frame(FrameId(3)).unwrap().globals(), PageGlobals::default());
}

// === Frame lifecycle through the app ===

#[test]
fn navigation_reinstalls_into_new_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json").to_string_lossy().to_string();
    let mut app = App::with_settings(SettingsEngine::new(Some(path)).with_env_trace(TraceFlags::default()));
    let mut session = HeadlessSession::new();

    session.load_frame(FrameId(8), "https://www.messenger.com/a");
    app.on_frame_loaded(&mut session, FrameId(8), "https://www.messenger.com/a", false);
    // Duplicate load event for the same document.
    app.on_frame_loaded(&mut session, FrameId(8), "https://www.messenger.com/a", false);
    assert_eq!(session.frame(FrameId(8)).unwrap().socket_wraps(), 1);
    let first_scripts = session.frame(FrameId(8)).unwrap().scripts_run().len();

    session.load_frame(FrameId(8), "https://www.messenger.com/b");
    assert!(!session.frame(FrameId(8)).unwrap().socket_patched());
    app.on_navigated(&mut session, FrameId(8), "https://www.messenger.com/b");

    let frame = session.frame(FrameId(8)).unwrap();
    assert!(frame.socket_patched());
    assert_eq!(app.frames.get(FrameId(8)).unwrap().generation, 1);
    assert!(first_scripts >= 2);

    app.on_frame_detached(FrameId(8));
    assert!(app.frames.is_empty());
}
