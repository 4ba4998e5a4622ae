//! Interceptor capability interface.
//!
//! Page-side overrides are installed per frame through the embedding
//! session's script channel. The registry remembers what went into each
//! document so repeated frame-load events do not re-inject; the injected
//! scripts carry their own sentinel as well.

use tracing::debug;

use crate::managers::frame_registry::{FrameRegistry, FrameRegistryTrait};
use crate::services::embedding::{EmbeddingSession, PageScript};
use crate::types::frame::FrameId;
use crate::types::signal::InterceptionTarget;

/// Result of an install attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
    /// Frame unknown or the script could not be delivered. Retried on the next sync.
    NotDelivered,
}

/// A page-context override that can be installed into frames.
pub trait Interceptor {
    fn target(&self) -> InterceptionTarget;
    fn install_script(&self) -> PageScript;
    /// Script that undoes the override, if the override can be undone at all.
    fn uninstall_script(&self) -> Option<PageScript>;

    fn is_installed(&self, registry: &FrameRegistry, frame: FrameId) -> bool {
        registry.is_installed(frame, self.target())
    }

    fn install(
        &self,
        session: &mut dyn EmbeddingSession,
        registry: &mut FrameRegistry,
        frame: FrameId,
    ) -> InstallOutcome {
        if !registry.is_attached(frame) {
            return InstallOutcome::NotDelivered;
        }
        if registry.is_installed(frame, self.target()) {
            return InstallOutcome::AlreadyInstalled;
        }
        match session.run_in_frame(frame, &self.install_script()) {
            Ok(()) => {
                registry.mark_installed(frame, self.target());
                InstallOutcome::Installed
            }
            Err(err) => {
                debug!(%frame, target = ?self.target(), %err, "install not delivered");
                InstallOutcome::NotDelivered
            }
        }
    }

    /// Returns `true` if the frame had the override recorded.
    fn uninstall(
        &self,
        session: &mut dyn EmbeddingSession,
        registry: &mut FrameRegistry,
        frame: FrameId,
    ) -> bool {
        if !registry.is_installed(frame, self.target()) {
            return false;
        }
        if let Some(script) = self.uninstall_script() {
            if let Err(err) = session.run_in_frame(frame, &script) {
                debug!(%frame, target = ?self.target(), %err, "uninstall not delivered");
            }
        }
        registry.clear_installed(frame, self.target())
    }
}
