// QuietShell platform paths for Linux
// Config:  $XDG_CONFIG_HOME/quietshell
// WebView: $XDG_DATA_HOME/quietshell/webview

use std::env;
use std::path::PathBuf;

use super::APP_DIR_LOWER;

fn home() -> String {
    env::var("HOME").unwrap_or_else(|_| String::from("/tmp"))
}

/// `xdg` wins when set and non-empty; otherwise `home` joined with `fallback`.
fn xdg_dir(xdg: Option<String>, home: &str, fallback: &[&str]) -> PathBuf {
    match xdg.filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => fallback.iter().fold(PathBuf::from(home), |p, part| p.join(part)),
    }
}

pub fn get_config_dir() -> PathBuf {
    xdg_dir(env::var("XDG_CONFIG_HOME").ok(), &home(), &[".config"]).join(APP_DIR_LOWER)
}

pub fn get_webview_data_dir() -> PathBuf {
    xdg_dir(env::var("XDG_DATA_HOME").ok(), &home(), &[".local", "share"])
        .join(APP_DIR_LOWER)
        .join("webview")
}
