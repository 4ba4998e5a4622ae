//! IPC message handler for QuietShell.
//!
//! Messages arrive from page scripts and the settings UI as JSON objects with
//! a `cmd` field; the remaining fields are the parameters. Kept separate
//! from the GUI host so it can be unit-tested against the headless session.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::app::App;
use crate::managers::frame_registry::FrameRegistryTrait;
use crate::services::embedding::EmbeddingSession;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::telemetry::{self, MAX_URL_LOG};
use crate::types::errors::IpcError;
use crate::types::frame::FrameId;
use crate::types::settings::Preference;
use crate::types::signal::SignalKind;

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, IpcError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| IpcError::MissingParam(name.to_string()))
}

fn bool_param(params: &Value, name: &str) -> Result<bool, IpcError> {
    params
        .get(name)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| IpcError::MissingParam(name.to_string()))
}

fn frame_param(params: &Value) -> Result<FrameId, IpcError> {
    params
        .get("frame_id")
        .and_then(|v| v.as_u64())
        .map(FrameId)
        .ok_or_else(|| IpcError::MissingParam("frame_id".to_string()))
}

/// Parse a raw IPC body and dispatch it.
pub fn handle_raw(
    app: &mut App,
    session: &mut dyn EmbeddingSession,
    body: &str,
) -> Result<Value, IpcError> {
    let msg: Value = serde_json::from_str(body).map_err(|e| IpcError::Malformed(e.to_string()))?;
    let cmd = msg
        .get("cmd")
        .and_then(|v| v.as_str())
        .ok_or_else(|| IpcError::Malformed("no cmd field".to_string()))?
        .to_string();
    handle_message(app, session, &cmd, &msg)
}

/// Dispatch one IPC command.
pub fn handle_message(
    app: &mut App,
    session: &mut dyn EmbeddingSession,
    cmd: &str,
    params: &Value,
) -> Result<Value, IpcError> {
    match cmd {
        "ping" => Ok(json!({"pong": true})),

        // ─── Preferences ───
        "get_preferences" => {
            let mut prefs = serde_json::Map::new();
            for pref in Preference::ALL {
                prefs.insert(pref.name().to_string(), json!(app.settings_engine.get_bool(pref)));
            }
            let settings = serde_json::to_value(app.settings_engine.get_settings())
                .map_err(|e| IpcError::Failed(e.to_string()))?;
            Ok(json!({"preferences": prefs, "settings": settings}))
        }
        "toggle" => {
            let key = str_param(params, "key")?;
            let pref = Preference::from_key(key)
                .ok_or_else(|| IpcError::Failed(format!("Unknown preference: {}", key)))?;
            let value = match params.get("value") {
                Some(_) => Some(bool_param(params, "value")?),
                None => None,
            };
            let outcome = match value {
                Some(value) => app.set_preference(session, pref, value),
                None => app.toggle_preference(session, pref),
            }
            .map_err(|e| IpcError::Failed(e.to_string()))?;
            Ok(json!({
                "key": pref.name(),
                "value": app.settings_engine.get_bool(pref),
                "reloaded": outcome.reloaded,
                "filterInstalled": outcome.filter_installed,
                "visibilityOverridden": outcome.visibility_overridden,
                "alsoDisabled": outcome.also_disabled.map(|p| p.name()),
            }))
        }
        "set_setting" => {
            let key = str_param(params, "key")?;
            let value = params
                .get("value")
                .cloned()
                .ok_or_else(|| IpcError::MissingParam("value".to_string()))?;
            // Boolean preferences go through the toggle path for their side effects.
            if let (Some(pref), Some(enabled)) = (Preference::from_key(key), value.as_bool()) {
                app.set_preference(session, pref, enabled)
                    .map_err(|e| IpcError::Failed(e.to_string()))?;
            } else {
                app.set_setting(key, value)
                    .map_err(|e| IpcError::Failed(e.to_string()))?;
            }
            Ok(json!({"ok": true}))
        }

        // ─── Frame lifecycle ───
        "frame_loaded" => {
            let frame = frame_param(params)?;
            let url = str_param(params, "url")?;
            let top = params.get("top").and_then(|v| v.as_bool()).unwrap_or(frame.is_main());
            app.on_frame_loaded(session, frame, url, top);
            Ok(json!({"ok": true, "frames": app.frames.len()}))
        }
        "navigated" => {
            let frame = frame_param(params)?;
            let url = str_param(params, "url")?;
            app.on_navigated(session, frame, url);
            Ok(json!({"ok": true}))
        }
        "frame_detached" => {
            let frame = frame_param(params)?;
            app.on_frame_detached(frame);
            Ok(json!({"ok": true, "frames": app.frames.len()}))
        }

        // ─── Observability ───
        "trace" => {
            let line = str_param(params, "line")?;
            info!(target: "quietshell::page", "{}", telemetry::truncate(line, MAX_URL_LOG * 2));
            Ok(json!({"ok": true}))
        }
        "socket_frame" => {
            let label = str_param(params, "kind")?;
            let kind = SignalKind::from_label(label)
                .ok_or_else(|| IpcError::Failed(format!("Unknown signal kind: {}", label)))?;
            let dropped = bool_param(params, "dropped")?;
            app.record_socket_frame(kind, dropped);
            Ok(json!({"ok": true}))
        }
        "stats" => {
            let stats = app.stats(session);
            Ok(json!({
                "requestsAllowed": stats.requests_allowed,
                "requestsCancelled": stats.requests_cancelled(),
                "loopbackProbesCancelled": stats.loopback_probes_cancelled,
                "readReceiptsCancelled": stats.read_receipts_cancelled,
                "typingRequestsCancelled": stats.typing_requests_cancelled,
                "socketFramesDropped": stats.socket_frames_dropped(),
                "socketTypingDropped": stats.socket_typing_dropped,
                "socketActiveStatusDropped": stats.socket_active_status_dropped,
                "socketReadReceiptsDropped": stats.socket_read_receipts_dropped,
                "socketSignalsForwarded": stats.socket_signals_forwarded,
                "frames": app.frames.len(),
            }))
        }

        _ => {
            debug!(cmd, "unknown IPC command");
            Err(IpcError::UnknownCommand(cmd.to_string()))
        }
    }
}
