use serde::{Deserialize, Serialize};

use super::frame::{SuppressionFlags, TraceFlags};

/// Top-level shell settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShellSettings {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub privacy: PrivacySettings,
    #[serde(default)]
    pub debug: DebugSettings,
    #[serde(default)]
    pub appearance: AppearanceSettings,
    #[serde(default)]
    pub productivity: ProductivitySettings,
}

impl ShellSettings {
    pub fn suppression_flags(&self) -> SuppressionFlags {
        SuppressionFlags {
            block_read_receipts: self.privacy.block_read_receipts,
            block_typing_indicator: self.privacy.block_typing_indicator,
            block_active_status: self.privacy.block_active_status,
        }
    }

    pub fn trace_flags(&self) -> TraceFlags {
        TraceFlags {
            debug_trace: self.debug.trace,
            trace_socket: self.debug.trace_socket,
            trace_payloads: self.debug.trace_payloads,
        }
    }
}

/// General shell settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralSettings {
    pub home_url: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            home_url: "https://www.messenger.com/".to_string(),
        }
    }
}

/// Outbound-signal suppression preferences. All off by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PrivacySettings {
    #[serde(default)]
    pub block_read_receipts: bool,
    #[serde(default)]
    pub block_typing_indicator: bool,
    #[serde(default)]
    pub block_active_status: bool,
}

/// Diagnostics. Purely observational.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DebugSettings {
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub trace_socket: bool,
    #[serde(default)]
    pub trace_payloads: bool,
}

/// Appearance settings. `dark_mode` and `high_contrast` are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppearanceSettings {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub high_contrast: bool,
    #[serde(default = "default_zoom")]
    pub zoom_percent: u32,
}

fn default_zoom() -> u32 {
    100
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            high_contrast: false,
            zoom_percent: default_zoom(),
        }
    }
}

/// Scheduling and keyword alert settings. Stored only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductivitySettings {
    #[serde(default = "default_schedule_delay")]
    pub schedule_delay_seconds: u32,
    #[serde(default)]
    pub keyword_alerts: Vec<String>,
}

fn default_schedule_delay() -> u32 {
    60
}

impl Default for ProductivitySettings {
    fn default() -> Self {
        Self {
            schedule_delay_seconds: default_schedule_delay(),
            keyword_alerts: Vec::new(),
        }
    }
}

/// A boolean preference the toggle controller knows how to flip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Preference {
    BlockReadReceipts,
    BlockTypingIndicator,
    BlockActiveStatus,
    DebugTrace,
    TraceSocket,
    TracePayloads,
    DarkMode,
    HighContrast,
}

impl Preference {
    pub const ALL: [Preference; 8] = [
        Preference::BlockReadReceipts,
        Preference::BlockTypingIndicator,
        Preference::BlockActiveStatus,
        Preference::DebugTrace,
        Preference::TraceSocket,
        Preference::TracePayloads,
        Preference::DarkMode,
        Preference::HighContrast,
    ];

    /// Dot-notation path inside `ShellSettings`.
    pub fn key_path(self) -> &'static str {
        match self {
            Preference::BlockReadReceipts => "privacy.block_read_receipts",
            Preference::BlockTypingIndicator => "privacy.block_typing_indicator",
            Preference::BlockActiveStatus => "privacy.block_active_status",
            Preference::DebugTrace => "debug.trace",
            Preference::TraceSocket => "debug.trace_socket",
            Preference::TracePayloads => "debug.trace_payloads",
            Preference::DarkMode => "appearance.dark_mode",
            Preference::HighContrast => "appearance.high_contrast",
        }
    }

    /// The flat name menus and page scripts use.
    pub fn name(self) -> &'static str {
        match self {
            Preference::BlockReadReceipts => "blockReadReceipts",
            Preference::BlockTypingIndicator => "blockTypingIndicator",
            Preference::BlockActiveStatus => "blockActiveStatus",
            Preference::DebugTrace => "debugTrace",
            Preference::TraceSocket => "traceSocket",
            Preference::TracePayloads => "tracePayloads",
            Preference::DarkMode => "darkMode",
            Preference::HighContrast => "highContrast",
        }
    }

    /// Accepts either the flat name or the dot path.
    pub fn from_key(key: &str) -> Option<Preference> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == key || p.key_path() == key)
    }

    pub fn is_suppression(self) -> bool {
        matches!(
            self,
            Preference::BlockReadReceipts
                | Preference::BlockTypingIndicator
                | Preference::BlockActiveStatus
        )
    }

    pub fn is_trace(self) -> bool {
        matches!(
            self,
            Preference::DebugTrace | Preference::TraceSocket | Preference::TracePayloads
        )
    }

    /// The other half of a mutually exclusive pair, if any.
    pub fn exclusive_with(self) -> Option<Preference> {
        match self {
            Preference::DarkMode => Some(Preference::HighContrast),
            Preference::HighContrast => Some(Preference::DarkMode),
            _ => None,
        }
    }

    pub fn read(self, settings: &ShellSettings) -> bool {
        match self {
            Preference::BlockReadReceipts => settings.privacy.block_read_receipts,
            Preference::BlockTypingIndicator => settings.privacy.block_typing_indicator,
            Preference::BlockActiveStatus => settings.privacy.block_active_status,
            Preference::DebugTrace => settings.debug.trace,
            Preference::TraceSocket => settings.debug.trace_socket,
            Preference::TracePayloads => settings.debug.trace_payloads,
            Preference::DarkMode => settings.appearance.dark_mode,
            Preference::HighContrast => settings.appearance.high_contrast,
        }
    }
}
