//! App Core for QuietShell.
//!
//! Owns the preference store, the frame registry, the request filter and the
//! toggle controller, and wires embedding-session events into them. The
//! session itself belongs to the host (WebView or headless) and is lent to
//! each call.

use tracing::{debug, info, warn};

use crate::managers::frame_registry::{FrameRegistry, FrameRegistryTrait};
use crate::services::embedding::EmbeddingSession;
use crate::services::request_filter::NetworkRequestFilter;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::toggle_controller::{SuppressionContext, ToggleController, ToggleOutcome};
use crate::types::errors::{SettingsError, ToggleError};
use crate::types::frame::{FrameId, PageGlobals};
use crate::types::settings::Preference;
use crate::types::signal::{SignalKind, SuppressionStats};

/// Central application struct.
pub struct App {
    pub settings_engine: SettingsEngine,
    pub frames: FrameRegistry,
    pub request_filter: NetworkRequestFilter,
    pub toggle_controller: ToggleController,
    /// Socket frames reported by page scripts over IPC.
    page_socket_stats: SuppressionStats,
}

/// True if writing `key` would change a boolean preference, either by its
/// own path or name or as part of its section.
fn covers_preference(key: &str) -> bool {
    if key.is_empty() || Preference::from_key(key).is_some() {
        return true;
    }
    let section = format!("{}.", key);
    Preference::ALL.iter().any(|p| p.key_path().starts_with(&section))
}

impl App {
    /// Creates a new App with settings loaded from `config_path` (or the
    /// platform default). A missing or unreadable file leaves defaults in place.
    pub fn new(config_path: Option<String>) -> Self {
        let mut settings_engine = SettingsEngine::new(config_path);
        if let Err(err) = settings_engine.load() {
            warn!(%err, path = settings_engine.get_config_path(), "using default settings");
        }
        Self::with_settings(settings_engine)
    }

    /// Creates an App around an already-prepared preference store.
    pub fn with_settings(settings_engine: SettingsEngine) -> Self {
        Self {
            settings_engine,
            frames: FrameRegistry::new(),
            request_filter: NetworkRequestFilter::new(),
            toggle_controller: ToggleController::new(),
            page_socket_stats: SuppressionStats::default(),
        }
    }

    fn context<'a>(&'a mut self, session: &'a mut dyn EmbeddingSession) -> SuppressionContext<'a> {
        SuppressionContext {
            settings: &mut self.settings_engine,
            filter: &mut self.request_filter,
            frames: &mut self.frames,
            session,
        }
    }

    /// Startup sequence: arm the request filter from stored flags.
    /// Frames are prepared as they report in.
    pub fn startup(&mut self, session: &mut dyn EmbeddingSession) {
        let controller = self.toggle_controller;
        let (filter_installed, _) = controller.reconcile(&mut self.context(session));
        info!(
            flags = ?self.settings_engine.suppression_flags(),
            filter_installed,
            "suppression engine started"
        );
    }

    /// A frame finished loading. Duplicate reports for the same document
    /// are no-ops apart from the URL update.
    pub fn on_frame_loaded(
        &mut self,
        session: &mut dyn EmbeddingSession,
        frame: FrameId,
        url: &str,
        is_main: bool,
    ) {
        if self.frames.attach(frame, url, is_main) {
            debug!(%frame, url, is_main, "frame attached");
        }
        let controller = self.toggle_controller;
        controller.prepare_frame(&mut self.context(session), frame);
    }

    /// A frame navigated to a new document.
    pub fn on_navigated(&mut self, session: &mut dyn EmbeddingSession, frame: FrameId, url: &str) {
        self.frames.begin_document(frame, url);
        let controller = self.toggle_controller;
        controller.prepare_frame(&mut self.context(session), frame);
    }

    pub fn on_frame_detached(&mut self, frame: FrameId) {
        if self.frames.detach(frame).is_some() {
            debug!(%frame, "frame detached");
        }
    }

    /// Set a boolean preference and apply its side effects. The store
    /// persists each write itself.
    pub fn set_preference(
        &mut self,
        session: &mut dyn EmbeddingSession,
        pref: Preference,
        enabled: bool,
    ) -> Result<ToggleOutcome, ToggleError> {
        let controller = self.toggle_controller;
        controller.set(&mut self.context(session), pref, enabled)
    }

    pub fn toggle_preference(
        &mut self,
        session: &mut dyn EmbeddingSession,
        pref: Preference,
    ) -> Result<ToggleOutcome, ToggleError> {
        let current = self.settings_engine.get_bool(pref);
        self.set_preference(session, pref, !current)
    }

    /// Write a non-preference setting such as `general.home_url`. Keys that
    /// reach a boolean preference are refused; those go through
    /// [`App::set_preference`].
    pub fn set_setting(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if covers_preference(key) {
            return Err(SettingsError::InvalidKey(key.to_string()));
        }
        self.settings_engine.set_value(key, value)
    }

    /// Flags for the document-start seed script.
    pub fn document_seed(&self) -> PageGlobals {
        self.settings_engine.page_globals()
    }

    /// The messenger page the shell opens.
    pub fn home_url(&self) -> String {
        self.settings_engine.get_settings().general.home_url.clone()
    }

    /// Shutdown sequence: flush settings.
    pub fn shutdown(&self) {
        if let Err(err) = self.settings_engine.save() {
            warn!(%err, "settings not saved");
        }
    }

    /// A socket frame the page classified and either dropped or forwarded.
    pub fn record_socket_frame(&mut self, kind: SignalKind, dropped: bool) {
        self.page_socket_stats.record_socket(kind, dropped);
    }

    /// Request counters from the filter plus socket counters from the
    /// session and from page reports.
    pub fn stats(&self, session: &dyn EmbeddingSession) -> SuppressionStats {
        let mut stats = self.request_filter.stats();
        stats.merge(&session.socket_stats());
        stats.merge(&self.page_socket_stats);
        stats
    }
}
