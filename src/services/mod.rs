// QuietShell services
// Suppression engine components, the preference store and the embedding-session seam.

pub mod embedding;
pub mod flag_sync;
pub mod headless_page;
pub mod interceptor;
pub mod request_filter;
pub mod settings_engine;
pub mod signal_classifier;
pub mod socket_interceptor;
pub mod toggle_controller;
pub mod visibility_override;
