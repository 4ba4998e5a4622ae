//! Toggle Controller.
//!
//! Reacts to a preference flip. Enabling a suppression takes effect at once:
//! the request filter is re-armed, flags are re-synced into every frame and
//! the visibility override is applied if now required. Disabling read-receipt
//! or typing suppression additionally reloads the embedded page, since the
//! in-page patches left behind cannot be fully reversed. Active-status and
//! trace flags recover through a re-sync alone.

use tracing::{debug, info};

use crate::managers::frame_registry::{FrameRegistry, FrameRegistryTrait};
use crate::services::embedding::EmbeddingSession;
use crate::services::flag_sync::FlagSynchronizer;
use crate::services::interceptor::Interceptor;
use crate::services::request_filter::NetworkRequestFilter;
use crate::services::settings_engine::SettingsEngine;
use crate::services::socket_interceptor::SocketFrameInterceptor;
use crate::services::visibility_override::VisibilityOverride;
use crate::types::errors::ToggleError;
use crate::types::frame::FrameId;
use crate::types::settings::Preference;

/// Direction of a preference change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enable,
    Disable,
    Unchanged,
}

impl Transition {
    pub fn between(before: bool, after: bool) -> Self {
        match (before, after) {
            (false, true) => Transition::Enable,
            (true, false) => Transition::Disable,
            _ => Transition::Unchanged,
        }
    }
}

/// Whether this change needs a full page reload.
pub fn requires_reload(pref: Preference, transition: Transition) -> bool {
    transition == Transition::Disable
        && matches!(
            pref,
            Preference::BlockReadReceipts | Preference::BlockTypingIndicator
        )
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub preference: Preference,
    pub transition: Transition,
    pub reloaded: bool,
    pub filter_installed: bool,
    pub visibility_overridden: bool,
    /// The mutually exclusive partner switched off by this change.
    pub also_disabled: Option<Preference>,
}

/// Everything a toggle touches, borrowed for the duration of one change.
pub struct SuppressionContext<'a> {
    pub settings: &'a mut SettingsEngine,
    pub filter: &'a mut NetworkRequestFilter,
    pub frames: &'a mut FrameRegistry,
    pub session: &'a mut dyn EmbeddingSession,
}

/// Stateless apart from its collaborators; the preference store is the state.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToggleController {
    sync: FlagSynchronizer,
    socket: SocketFrameInterceptor,
    visibility: VisibilityOverride,
}

impl ToggleController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `pref` to `enabled` and apply side effects.
    pub fn set(
        &self,
        ctx: &mut SuppressionContext<'_>,
        pref: Preference,
        enabled: bool,
    ) -> Result<ToggleOutcome, ToggleError> {
        let before = ctx.settings.get_bool(pref);
        let transition = Transition::between(before, enabled);

        if transition == Transition::Unchanged {
            return Ok(ToggleOutcome {
                preference: pref,
                transition,
                reloaded: false,
                filter_installed: ctx.filter.is_installed(),
                visibility_overridden: ctx.settings.suppression_flags().needs_visibility_override(),
                also_disabled: None,
            });
        }

        ctx.settings.set_bool(pref, enabled)?;

        let mut also_disabled = None;
        if enabled {
            if let Some(other) = pref.exclusive_with() {
                if ctx.settings.get_bool(other) {
                    ctx.settings.set_bool(other, false)?;
                    also_disabled = Some(other);
                }
            }
        }

        if !pref.is_suppression() && !pref.is_trace() {
            return Ok(ToggleOutcome {
                preference: pref,
                transition,
                reloaded: false,
                filter_installed: ctx.filter.is_installed(),
                visibility_overridden: ctx.settings.suppression_flags().needs_visibility_override(),
                also_disabled,
            });
        }

        let (filter_installed, visibility_overridden) = self.reconcile(ctx);

        let reloaded = requires_reload(pref, transition);
        if reloaded {
            info!(preference = pref.name(), "reloading page to drop in-page patches");
            ctx.session.reload();
            ctx.frames.clear();
        }

        debug!(
            preference = pref.name(),
            ?transition,
            filter_installed,
            visibility_overridden,
            reloaded,
            "preference applied"
        );

        Ok(ToggleOutcome {
            preference: pref,
            transition,
            reloaded,
            filter_installed,
            visibility_overridden,
            also_disabled,
        })
    }

    /// Flip `pref`.
    pub fn toggle(
        &self,
        ctx: &mut SuppressionContext<'_>,
        pref: Preference,
    ) -> Result<ToggleOutcome, ToggleError> {
        let current = ctx.settings.get_bool(pref);
        self.set(ctx, pref, !current)
    }

    /// Same as [`set`](Self::set) but keyed by preference name or dot path.
    pub fn set_by_key(
        &self,
        ctx: &mut SuppressionContext<'_>,
        key: &str,
        enabled: bool,
    ) -> Result<ToggleOutcome, ToggleError> {
        let pref = Preference::from_key(key)
            .ok_or_else(|| ToggleError::UnknownPreference(key.to_string()))?;
        self.set(ctx, pref, enabled)
    }

    /// Bring filter, frame globals and visibility in line with the store.
    /// Returns `(filter_installed, visibility_overridden)`.
    pub fn reconcile(&self, ctx: &mut SuppressionContext<'_>) -> (bool, bool) {
        let flags = ctx.settings.suppression_flags();
        let trace = ctx.settings.trace_flags();
        let globals = ctx.settings.page_globals();

        let filter_installed = ctx.filter.rearm(&mut *ctx.session, flags, trace);
        self.sync.sync_all(&mut *ctx.session, ctx.frames, globals);

        let want_visibility = flags.needs_visibility_override();
        for frame in ctx.frames.frame_ids() {
            if want_visibility {
                self.visibility.install(&mut *ctx.session, ctx.frames, frame);
            } else {
                self.visibility.uninstall(&mut *ctx.session, ctx.frames, frame);
            }
        }
        (filter_installed, want_visibility)
    }

    /// A frame finished loading: interceptor first, then flags, then
    /// visibility if either governing flag wants it.
    pub fn prepare_frame(&self, ctx: &mut SuppressionContext<'_>, frame: FrameId) {
        self.socket.install(&mut *ctx.session, ctx.frames, frame);
        let globals = ctx.settings.page_globals();
        self.sync.sync(&mut *ctx.session, ctx.frames, frame, globals);
        if globals.flags.needs_visibility_override() {
            self.visibility.install(&mut *ctx.session, ctx.frames, frame);
        }
    }
}
