//! QuietShell UI layer.
//!
//! Uses `wry` for cross-platform WebView rendering:
//! - Windows: WebView2
//! - Linux: WebKitGTK
//! - macOS: WKWebView
//!
//! The messenger page is loaded directly; page-context overrides go in as
//! initialization scripts and the frame bridge reports frame lifecycle over
//! wry IPC.

pub mod webview_app;
