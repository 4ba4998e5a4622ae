use std::fmt;

use super::frame::FrameId;

// === SettingsError ===

/// Errors related to the preference store.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

// === InjectionError ===

/// Errors returned by the embedding session when running a script in a frame.
///
/// The suppression engine swallows all of these; they exist so hosts can say why.
#[derive(Debug)]
pub enum InjectionError {
    /// The frame was torn down before or during injection.
    FrameDetached(FrameId),
    /// The host refused to run script in the frame (cross-origin, sandboxed).
    PermissionDenied(String),
    /// The script threw or the host failed to evaluate it.
    ScriptFailed(String),
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionError::FrameDetached(id) => write!(f, "Frame detached: {}", id),
            InjectionError::PermissionDenied(msg) => {
                write!(f, "Script injection denied: {}", msg)
            }
            InjectionError::ScriptFailed(msg) => write!(f, "Script evaluation failed: {}", msg),
        }
    }
}

impl std::error::Error for InjectionError {}

// === TransportError ===

/// Errors from a page socket transport.
#[derive(Debug)]
pub enum TransportError {
    /// The socket is closed or closing.
    Closed,
    /// The underlying transport rejected the frame.
    SendFailed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Closed => write!(f, "Socket is closed"),
            TransportError::SendFailed(msg) => write!(f, "Socket send failed: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

// === ToggleError ===

/// Errors related to flipping a preference.
#[derive(Debug)]
pub enum ToggleError {
    /// The key does not name a toggleable preference.
    UnknownPreference(String),
    /// The preference store rejected the write.
    Store(SettingsError),
}

impl fmt::Display for ToggleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleError::UnknownPreference(key) => write!(f, "Unknown preference: {}", key),
            ToggleError::Store(err) => write!(f, "Preference store error: {}", err),
        }
    }
}

impl std::error::Error for ToggleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ToggleError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SettingsError> for ToggleError {
    fn from(err: SettingsError) -> Self {
        ToggleError::Store(err)
    }
}

// === IpcError ===

/// Errors related to IPC messages from the page or settings UI.
#[derive(Debug)]
pub enum IpcError {
    /// The message was not valid JSON or lacked a `cmd` field.
    Malformed(String),
    /// A required parameter was missing or had the wrong type.
    MissingParam(String),
    /// The command is not known.
    UnknownCommand(String),
    /// The command was understood but the operation failed.
    Failed(String),
}

impl fmt::Display for IpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpcError::Malformed(msg) => write!(f, "Malformed IPC message: {}", msg),
            IpcError::MissingParam(name) => write!(f, "missing {}", name),
            IpcError::UnknownCommand(cmd) => write!(f, "unknown command: {}", cmd),
            IpcError::Failed(msg) => write!(f, "IPC command failed: {}", msg),
        }
    }
}

impl std::error::Error for IpcError {}
