// QuietShell platform paths for macOS
// Config:  ~/Library/Application Support/QuietShell
// WebView: ~/Library/Application Support/QuietShell/WebView

use std::env;
use std::path::PathBuf;

use super::APP_DIR_TITLE;

fn app_support() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
        .join("Library")
        .join("Application Support")
        .join(APP_DIR_TITLE)
}

pub fn get_config_dir() -> PathBuf {
    app_support()
}

pub fn get_webview_data_dir() -> PathBuf {
    app_support().join("WebView")
}
