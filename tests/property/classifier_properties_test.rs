//! Property-based tests for the signal classifier and the policies built on it.
//!
//! These check the matching precedence over arbitrary inputs: URL patterns
//! win over bodies, the typing fallback fires without a URL match, and any
//! socket payload naming `is_typing` is a typing frame.

use proptest::prelude::*;
use quietshell::services::request_filter::{evaluate, FilterVerdict};
use quietshell::services::signal_classifier::{
    classify_payload, classify_request, READ_RECEIPT_URL_PATTERNS,
};
use quietshell::services::visibility_override::DocumentVisibility;
use quietshell::types::frame::SuppressionFlags;
use quietshell::types::signal::{RequestDetails, SignalKind, SocketPayload};

fn arb_read_receipt_url() -> impl Strategy<Value = String> {
    (
        prop::sample::select(READ_RECEIPT_URL_PATTERNS.to_vec()),
        "[a-z0-9/]{0,12}",
    )
        .prop_map(|(pattern, suffix)| format!("https://www.messenger.com{}{}", pattern, suffix))
}

fn arb_mixed_case(word: &'static str) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
        word.chars()
            .zip(upper)
            .map(|(c, u)| if u { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

proptest! {
    #[test]
    fn read_receipt_url_wins_regardless_of_body(url in arb_read_receipt_url(), body in ".{0,80}") {
        prop_assert_eq!(classify_request(&url, Some(&body)), SignalKind::ReadReceipt);
        prop_assert_eq!(classify_request(&url, None), SignalKind::ReadReceipt);
    }

    #[test]
    fn typing_body_fallback_without_url_match(
        path in "[0-9]{1,8}",
        keyword in prop::sample::select(vec!["is_typing", "typing_state", "send_typing", "typing"]),
        truthy in prop::sample::select(vec!["=true", ":true", "=1", ":1"]),
        filler in "[0-9 ]{0,20}",
    ) {
        let url = format!("https://example.org/{}", path);
        let body = format!("{}{}{}{}", filler, keyword, truthy, filler);
        prop_assert_eq!(classify_request(&url, Some(&body)), SignalKind::Typing);
    }

    #[test]
    fn is_typing_payload_is_always_typing(
        prefix in ".{0,30}",
        word in arb_mixed_case("is_typing"),
        suffix in ".{0,30}",
    ) {
        let text = format!("{}{}{}", prefix, word, suffix);
        prop_assert_eq!(classify_payload(&SocketPayload::from(text.as_str())), SignalKind::Typing);
        prop_assert_eq!(classify_payload(&SocketPayload::Binary(text.into_bytes())), SignalKind::Typing);
    }

    #[test]
    fn nothing_but_probes_is_cancelled_with_flags_off(path in "[a-z0-9/_.]{0,40}", body in ".{0,60}") {
        let details = RequestDetails::post(&format!("https://www.messenger.com/{}", path), &body);
        prop_assert_eq!(evaluate(&SuppressionFlags::default(), &details), FilterVerdict::Allow);
    }

    #[test]
    fn visibility_apply_restore_round_trip(hidden in any::<bool>(), focused in any::<bool>()) {
        let mut doc = DocumentVisibility::foreground();
        doc.set_native(hidden, focused);
        let before = (doc.hidden(), doc.visibility_state(), doc.has_focus());

        doc.apply();
        prop_assert!(doc.hidden());
        prop_assert!(!doc.has_focus());
        doc.restore();

        prop_assert_eq!((doc.hidden(), doc.visibility_state(), doc.has_focus()), before);
    }
}
