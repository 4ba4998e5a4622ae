// QuietShell platform abstraction
// Per-OS locations for the preference file and the WebView profile.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Directory name on case-sensitive XDG systems.
pub const APP_DIR_LOWER: &str = "quietshell";
/// Directory name on macOS and Windows.
pub const APP_DIR_TITLE: &str = "QuietShell";

/// Returns the directory holding `settings.json`.
///
/// - **Linux**: `$XDG_CONFIG_HOME/quietshell` or `~/.config/quietshell`
/// - **macOS**: `~/Library/Application Support/QuietShell`
/// - **Windows**: `%APPDATA%/QuietShell`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the directory for the embedded WebView's profile
/// (cookies, local storage). Kept apart from the preference file so
/// clearing one does not touch the other.
///
/// - **Linux**: `$XDG_DATA_HOME/quietshell/webview` or `~/.local/share/quietshell/webview`
/// - **macOS**: `~/Library/Application Support/QuietShell/WebView`
/// - **Windows**: `%LOCALAPPDATA%/QuietShell/WebView`
pub fn get_webview_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_webview_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_webview_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_webview_data_dir()
    }
}
