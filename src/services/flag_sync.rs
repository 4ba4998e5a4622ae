//! Flag Synchronizer.
//!
//! The only writer of the page-context flag globals. Runs once per frame right
//! after the socket interceptor is installed, and across every live frame
//! whenever a governing flag changes.

use tracing::debug;

use crate::managers::frame_registry::{FrameRegistry, FrameRegistryTrait};
use crate::services::embedding::{EmbeddingSession, PageScript};
use crate::types::frame::{FrameId, PageGlobals};

#[derive(Debug, Default, Clone, Copy)]
pub struct FlagSynchronizer;

impl FlagSynchronizer {
    pub fn new() -> Self {
        Self
    }

    /// Push `globals` into one frame. Returns whether the script was delivered.
    /// Failures are swallowed; the next sync or reload corrects them.
    pub fn sync(
        &self,
        session: &mut dyn EmbeddingSession,
        registry: &mut FrameRegistry,
        frame: FrameId,
        globals: PageGlobals,
    ) -> bool {
        if !registry.is_attached(frame) {
            return false;
        }
        match session.run_in_frame(frame, &PageScript::SyncFlags(globals)) {
            Ok(()) => {
                registry.record_sync(frame, globals);
                true
            }
            Err(err) => {
                debug!(%frame, %err, "flag sync not delivered");
                false
            }
        }
    }

    /// Push `globals` into every live frame. Returns how many took it.
    pub fn sync_all(
        &self,
        session: &mut dyn EmbeddingSession,
        registry: &mut FrameRegistry,
        globals: PageGlobals,
    ) -> usize {
        let mut delivered = 0;
        for frame in registry.frame_ids() {
            if self.sync(session, registry, frame, globals) {
                delivered += 1;
            }
        }
        delivered
    }
}
