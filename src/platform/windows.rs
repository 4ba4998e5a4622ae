// QuietShell platform paths for Windows
// Config:  %APPDATA%/QuietShell
// WebView: %LOCALAPPDATA%/QuietShell/WebView

use std::env;
use std::path::PathBuf;

use super::APP_DIR_TITLE;

pub fn get_config_dir() -> PathBuf {
    let appdata =
        env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata).join(APP_DIR_TITLE)
}

pub fn get_webview_data_dir() -> PathBuf {
    let local_appdata = env::var("LOCALAPPDATA")
        .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Local"));
    PathBuf::from(local_appdata).join(APP_DIR_TITLE).join("WebView")
}
