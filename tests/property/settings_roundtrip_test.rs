//! Property-based tests for the preference store.
//!
//! Settings written through the engine must come back unchanged from disk,
//! and flat preference names must address the same field as their dot paths.

use proptest::prelude::*;
use quietshell::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use quietshell::types::frame::TraceFlags;
use quietshell::types::settings::{
    AppearanceSettings, DebugSettings, GeneralSettings, Preference, PrivacySettings,
    ProductivitySettings, ShellSettings,
};

fn arb_privacy_settings() -> impl Strategy<Value = PrivacySettings> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(block_read_receipts, block_typing_indicator, block_active_status)| PrivacySettings {
            block_read_receipts,
            block_typing_indicator,
            block_active_status,
        },
    )
}

fn arb_debug_settings() -> impl Strategy<Value = DebugSettings> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(trace, trace_socket, trace_payloads)| {
        DebugSettings {
            trace,
            trace_socket,
            trace_payloads,
        }
    })
}

fn arb_appearance_settings() -> impl Strategy<Value = AppearanceSettings> {
    // At most one of dark mode / high contrast.
    (0u8..3, 50u32..=300u32).prop_map(|(mode, zoom_percent)| AppearanceSettings {
        dark_mode: mode == 1,
        high_contrast: mode == 2,
        zoom_percent,
    })
}

fn arb_productivity_settings() -> impl Strategy<Value = ProductivitySettings> {
    (0u32..=3600u32, proptest::collection::vec("[a-zA-Z ]{1,20}", 0..=5)).prop_map(
        |(schedule_delay_seconds, keyword_alerts)| ProductivitySettings {
            schedule_delay_seconds,
            keyword_alerts,
        },
    )
}

fn arb_shell_settings() -> impl Strategy<Value = ShellSettings> {
    (
        "https://[a-z]{3,12}\\.com/[a-z]{0,10}",
        arb_privacy_settings(),
        arb_debug_settings(),
        arb_appearance_settings(),
        arb_productivity_settings(),
    )
        .prop_map(|(home_url, privacy, debug, appearance, productivity)| ShellSettings {
            general: GeneralSettings { home_url },
            privacy,
            debug,
            appearance,
            productivity,
        })
}

fn arb_preference() -> impl Strategy<Value = Preference> {
    proptest::sample::select(Preference::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn settings_survive_save_and_load(settings in arb_shell_settings()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();
        std::fs::write(&path, serde_json::to_string(&settings).unwrap()).unwrap();

        let mut engine = SettingsEngine::new(Some(path.clone())).with_env_trace(TraceFlags::default());
        prop_assert_eq!(&engine.load().unwrap(), &settings);
        engine.save().unwrap();

        let mut reread = SettingsEngine::new(Some(path)).with_env_trace(TraceFlags::default());
        prop_assert_eq!(reread.load().unwrap(), settings);
    }

    #[test]
    fn flat_name_and_dot_path_agree(pref in arb_preference(), value in any::<bool>()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();
        let mut engine = SettingsEngine::new(Some(path)).with_env_trace(TraceFlags::default());

        engine.set_value(pref.name(), serde_json::Value::Bool(value)).unwrap();
        prop_assert_eq!(engine.get_value(pref.key_path()).unwrap(), serde_json::Value::Bool(value));
        prop_assert_eq!(engine.get_bool(pref), value);
    }
}
