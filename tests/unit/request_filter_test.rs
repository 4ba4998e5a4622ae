use quietshell::app::App;
use quietshell::services::headless_page::HeadlessSession;
use quietshell::services::request_filter::*;
use quietshell::services::settings_engine::SettingsEngine;
use quietshell::types::frame::{FrameId, SuppressionFlags, TraceFlags};
use quietshell::types::settings::Preference;
use quietshell::types::signal::{RequestDetails, ResourceType};
use rstest::rstest;

const READ_URL: &str = "https://www.messenger.com/ajax/mercury/change_read_status.php";
const TYPING_URL: &str = "https://www.messenger.com/ajax/messaging/typ.php";

fn flags(read: bool, typing: bool) -> SuppressionFlags {
    SuppressionFlags {
        block_read_receipts: read,
        block_typing_indicator: typing,
        block_active_status: false,
    }
}

fn app_in(dir: &tempfile::TempDir) -> App {
    let path = dir.path().join("settings.json").to_string_lossy().to_string();
    App::with_settings(SettingsEngine::new(Some(path)).with_env_trace(TraceFlags::default()))
}

// === Policy ===

#[rstest]
#[case("http://localhost:3103/status")]
#[case("http://127.0.0.1:3103/ping?x=1")]
fn loopback_probe_cancelled_whatever_the_flags(#[case] url: &str) {
    for f in [flags(false, false), flags(true, false), flags(false, true)] {
        assert_eq!(
            evaluate(&f, &RequestDetails::get(url)),
            FilterVerdict::Cancel(CancelReason::LoopbackProbe)
        );
    }
}

#[test]
fn other_loopback_ports_are_not_probes() {
    assert!(!is_loopback_probe("http://localhost:8080/status"));
    assert!(!is_loopback_probe("not a url"));
    assert!(is_loopback_probe("http://localhost:3103/"));
}

#[test]
fn read_receipt_cancelled_only_with_its_flag() {
    let req = RequestDetails::post(READ_URL, "ids=1");
    assert_eq!(evaluate(&flags(false, true), &req), FilterVerdict::Allow);
    assert_eq!(
        evaluate(&flags(true, false), &req),
        FilterVerdict::Cancel(CancelReason::ReadReceipt)
    );
}

#[test]
fn typing_cancelled_only_with_its_flag() {
    let req = RequestDetails::post(TYPING_URL, "is_typing=true");
    assert_eq!(evaluate(&flags(true, false), &req), FilterVerdict::Allow);
    assert_eq!(
        evaluate(&flags(false, true), &req),
        FilterVerdict::Cancel(CancelReason::Typing)
    );
}

#[test]
fn socket_upgrade_never_cancelled_for_typing() {
    let upgrade = RequestDetails::get("wss://edge-chat.messenger.com/chat?region=1")
        .with_resource_type(ResourceType::WebSocket);
    assert!(upgrade.is_socket());
    assert_eq!(evaluate(&flags(true, true), &upgrade), FilterVerdict::Allow);
}

#[test]
fn intercept_patterns_cover_hosts_and_probe() {
    assert_eq!(intercept_patterns().len(), INTERCEPT_URL_PATTERNS.len());
    assert!(is_intercepted("https://www.messenger.com/t/1"));
    assert!(is_intercepted("wss://edge-chat.facebook.com/chat"));
    assert!(is_intercepted("http://127.0.0.1:3103/x"));
    assert!(!is_intercepted("http://www.messenger.com/"));
    assert!(!is_intercepted("https://example.com/"));
}

// === Install lifecycle ===

#[test]
fn install_is_idempotent_and_uninstall_needs_own_handle() {
    let mut session = HeadlessSession::new();
    let mut filter = NetworkRequestFilter::new();

    let first = filter.install(&mut session, flags(true, false), TraceFlags::default());
    let second = filter.install(&mut session, flags(true, true), TraceFlags::default());
    assert_eq!(first, second);
    assert!(session.has_request_hook());

    let mut other = NetworkRequestFilter::new();
    let foreign = other.install(&mut HeadlessSession::new(), flags(true, false), TraceFlags::default());
    assert!(!filter.uninstall(&mut session, foreign));
    assert!(session.has_request_hook());

    assert!(filter.uninstall(&mut session, first));
    assert!(!session.has_request_hook());
    assert!(!filter.is_installed());
}

#[test]
fn rearm_follows_governing_flags() {
    let mut session = HeadlessSession::new();
    let mut filter = NetworkRequestFilter::new();
    assert!(!filter.rearm(&mut session, flags(false, false), TraceFlags::default()));
    assert!(filter.rearm(&mut session, flags(false, true), TraceFlags::default()));
    assert!(session.has_request_hook());
    assert!(!filter.rearm(&mut session, flags(false, false), TraceFlags::default()));
    assert!(!session.has_request_hook());
}

#[test]
fn stats_count_each_reason() {
    let mut session = HeadlessSession::new();
    let mut filter = NetworkRequestFilter::new();
    filter.install(&mut session, flags(true, true), TraceFlags::default());

    session.send_request(RequestDetails::post(READ_URL, ""));
    session.send_request(RequestDetails::post(TYPING_URL, "is_typing=true"));
    session.send_request(RequestDetails::get("http://localhost:3103/"));
    session.send_request(RequestDetails::get("https://www.messenger.com/t/1"));
    // Outside the hook's patterns: never reaches the filter.
    session.send_request(RequestDetails::get("https://example.com/mark_seen"));

    let stats = filter.stats();
    assert_eq!(stats.read_receipts_cancelled, 1);
    assert_eq!(stats.typing_requests_cancelled, 1);
    assert_eq!(stats.loopback_probes_cancelled, 1);
    assert_eq!(stats.requests_allowed, 1);
    assert_eq!(stats.requests_cancelled(), 3);
    assert_eq!(session.cancelled_requests().len(), 3);
    assert_eq!(session.forwarded_requests().len(), 2);
}

// === End to end ===

#[test]
fn scenario_flags_off_forwards_read_receipt() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir);
    let mut session = HeadlessSession::new();
    app.startup(&mut session);
    session.load_frame(FrameId::MAIN, "https://www.messenger.com/");
    app.on_frame_loaded(&mut session, FrameId::MAIN, "https://www.messenger.com/", true);

    assert!(!app.request_filter.is_installed());
    assert!(!session.has_request_hook());

    let request = RequestDetails::post(READ_URL, "ids[123]=true&watermark=1");
    let response = session.send_request(request.clone());
    assert!(!response.cancel);
    assert_eq!(session.forwarded_requests(), &[request]);
}

#[test]
fn scenario_typing_flag_two_tier_matching() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(&dir);
    let mut session = HeadlessSession::new();
    app.startup(&mut session);

    let outcome = app
        .set_preference(&mut session, Preference::BlockTypingIndicator, true)
        .unwrap();
    assert!(outcome.filter_installed);

    // URL pattern match.
    assert!(session.send_request(RequestDetails::post(TYPING_URL, "is_typing=true")).cancel);

    // Same body on an unrelated endpoint: caught by the body heuristic.
    let unrelated = "https://www.messenger.com/api/graphql/";
    assert!(session.send_request(RequestDetails::post(unrelated, "is_typing=true")).cancel);

    // No URL match and nothing in the body that looks like typing.
    assert!(!session.send_request(RequestDetails::post(unrelated, "message=typing%20later")).cancel);
    // The word alone is not enough without a truthy marker.
    assert!(!session.send_request(RequestDetails::post(unrelated, "is_typing=false")).cancel);

    // Read receipts still flow: their flag is off.
    assert!(!session.send_request(RequestDetails::post(READ_URL, "")).cancel);
}
