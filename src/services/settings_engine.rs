// QuietShell Settings Engine
// The preference store: loads, saves, updates individual values and resets to defaults.
// Settings are stored as a JSON file at the platform-specific config path.

use std::env;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::frame::{PageGlobals, SuppressionFlags, TraceFlags};
use crate::types::settings::{Preference, ShellSettings};

/// Environment switch that forces the debug trace flag on.
pub const ENV_DEBUG_TRACE: &str = "QUIETSHELL_DEBUG_TRACE";
/// Environment switch that forces socket typing traces on.
pub const ENV_TRACE_SOCKET: &str = "QUIETSHELL_TRACE_SOCKET";

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<ShellSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &ShellSettings;
    fn get_value(&self, key: &str) -> Result<serde_json::Value, SettingsError>;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine implementation that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: ShellSettings,
    env_trace: TraceFlags,
}

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("yes") | Ok("on")
    )
}

/// Accept the flat preference names as well as dot paths.
fn resolve_key(key: &str) -> &str {
    match Preference::from_key(key) {
        Some(pref) => pref.key_path(),
        None => key,
    }
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform-specific config directory with `settings.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => {
                let config_dir = platform::get_config_dir();
                config_dir
                    .join("settings.json")
                    .to_string_lossy()
                    .to_string()
            }
        };

        Self {
            config_path,
            settings: ShellSettings::default(),
            env_trace: TraceFlags {
                debug_trace: env_flag(ENV_DEBUG_TRACE),
                trace_socket: env_flag(ENV_TRACE_SOCKET),
                trace_payloads: false,
            },
        }
    }

    /// Replace the environment overlay (tests, embedding hosts).
    pub fn with_env_trace(mut self, trace: TraceFlags) -> Self {
        self.env_trace = trace;
        self
    }

    /// `get(key)` from the preference-store interface.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.get_value(key).ok()
    }

    /// `set(key, value)` from the preference-store interface.
    pub fn set(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        self.set_value(key, value)
    }

    pub fn get_bool(&self, pref: Preference) -> bool {
        pref.read(&self.settings)
    }

    pub fn set_bool(&mut self, pref: Preference, value: bool) -> Result<(), SettingsError> {
        self.set_value(pref.key_path(), serde_json::Value::Bool(value))
    }

    pub fn suppression_flags(&self) -> SuppressionFlags {
        self.settings.suppression_flags()
    }

    /// Persisted trace flags OR'd with the environment overlay.
    pub fn trace_flags(&self) -> TraceFlags {
        let stored = self.settings.trace_flags();
        TraceFlags {
            debug_trace: stored.debug_trace || self.env_trace.debug_trace,
            trace_socket: stored.trace_socket || self.env_trace.trace_socket,
            trace_payloads: stored.trace_payloads || self.env_trace.trace_payloads,
        }
    }

    pub fn page_globals(&self) -> PageGlobals {
        PageGlobals::new(self.suppression_flags(), self.trace_flags())
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns default settings.
    /// If the file exists but is malformed, returns a serialization error.
    fn load(&mut self) -> Result<ShellSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.settings = ShellSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: ShellSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        self.settings = settings;
        debug!(path = %self.config_path, "settings loaded");
        Ok(self.settings.clone())
    }

    /// Saves the current settings to the JSON config file.
    ///
    /// Creates parent directories if they don't exist.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &ShellSettings {
        &self.settings
    }

    /// Reads one value by dot path or flat preference name.
    fn get_value(&self, key: &str) -> Result<serde_json::Value, SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }
        let path = resolve_key(key);
        let json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        let mut current = &json_value;
        for part in path.split('.') {
            current = current.get(part).ok_or_else(|| {
                SettingsError::InvalidKey(format!("Key '{}' not found in settings", key))
            })?;
        }
        Ok(current.clone())
    }

    /// Updates an individual setting by dot-notation key path.
    ///
    /// Converts the current settings to a `serde_json::Value`, navigates the
    /// dot-separated key path, updates the target value, then deserializes
    /// back into `ShellSettings`. Saves to disk after a successful update.
    ///
    /// # Examples
    /// - `"privacy.block_read_receipts"` → updates `settings.privacy.block_read_receipts`
    /// - `"blockTypingIndicator"` → same as `"privacy.block_typing_indicator"`
    /// - `"productivity.keyword_alerts"` → replaces the keyword list
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let path = resolve_key(key);
        let parts: Vec<&str> = path.split('.').collect();

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        {
            let mut current = &mut json_value;
            for (i, part) in parts.iter().enumerate() {
                if i == parts.len() - 1 {
                    match current {
                        serde_json::Value::Object(map) => {
                            if !map.contains_key(*part) {
                                return Err(SettingsError::InvalidKey(format!(
                                    "Key '{}' not found in settings",
                                    key
                                )));
                            }
                            map.insert(part.to_string(), value.clone());
                        }
                        _ => {
                            return Err(SettingsError::InvalidKey(format!(
                                "Cannot navigate to key '{}': intermediate value is not an object",
                                key
                            )));
                        }
                    }
                } else {
                    current = match current.get_mut(*part) {
                        Some(v) => v,
                        None => {
                            return Err(SettingsError::InvalidKey(format!(
                                "Key '{}' not found in settings",
                                key
                            )));
                        }
                    };
                }
            }
        }

        // Deserialize back to validate the new value's type
        let new_settings: ShellSettings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.settings = new_settings;
        self.save()?;

        Ok(())
    }

    /// Resets all settings to factory defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = ShellSettings::default();
        self.save()?;
        Ok(())
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
