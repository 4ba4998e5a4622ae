use std::collections::{BTreeMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::frame::{FrameId, PageGlobals};
use crate::types::signal::InterceptionTarget;

/// One live document context.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub id: FrameId,
    pub url: String,
    pub is_main: bool,
    /// Page-side overrides installed into the current document.
    pub installed: HashSet<InterceptionTarget>,
    /// Last globals pushed by the flag synchronizer.
    pub synced: Option<PageGlobals>,
    /// Bumped on every navigation of this frame.
    pub generation: u32,
    pub attached_at: i64,
}

/// Trait defining the frame registry interface.
pub trait FrameRegistryTrait {
    fn attach(&mut self, id: FrameId, url: &str, is_main: bool) -> bool;
    fn begin_document(&mut self, id: FrameId, url: &str);
    fn detach(&mut self, id: FrameId) -> Option<FrameRecord>;
    fn get(&self, id: FrameId) -> Option<&FrameRecord>;
    fn is_attached(&self, id: FrameId) -> bool;
    fn frame_ids(&self) -> Vec<FrameId>;
    fn mark_installed(&mut self, id: FrameId, target: InterceptionTarget) -> bool;
    fn clear_installed(&mut self, id: FrameId, target: InterceptionTarget) -> bool;
    fn is_installed(&self, id: FrameId, target: InterceptionTarget) -> bool;
    fn record_sync(&mut self, id: FrameId, globals: PageGlobals);
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
}

/// Frame registry keyed by frame identity.
///
/// Mirrors, on the privileged side, what the page-side sentinels say: which
/// frames exist and what has already been installed into their current
/// document. A `BTreeMap` keeps iteration order stable with the main frame first.
pub struct FrameRegistry {
    frames: BTreeMap<FrameId, FrameRecord>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self {
            frames: BTreeMap::new(),
        }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Frames that currently have `target` installed.
    pub fn frames_with(&self, target: InterceptionTarget) -> Vec<FrameId> {
        self.frames
            .values()
            .filter(|f| f.installed.contains(&target))
            .map(|f| f.id)
            .collect()
    }
}

impl Default for FrameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRegistryTrait for FrameRegistry {
    /// Register a frame that finished loading. Returns `false` if it was
    /// already known, in which case its installed state is kept.
    fn attach(&mut self, id: FrameId, url: &str, is_main: bool) -> bool {
        if let Some(existing) = self.frames.get_mut(&id) {
            existing.url = url.to_string();
            return false;
        }
        self.frames.insert(
            id,
            FrameRecord {
                id,
                url: url.to_string(),
                is_main,
                installed: HashSet::new(),
                synced: None,
                generation: 0,
                attached_at: Self::now(),
            },
        );
        true
    }

    /// The frame navigated: its global object is new, so nothing is installed.
    fn begin_document(&mut self, id: FrameId, url: &str) {
        match self.frames.get_mut(&id) {
            Some(record) => {
                record.url = url.to_string();
                record.installed.clear();
                record.synced = None;
                record.generation = record.generation.wrapping_add(1);
            }
            None => {
                self.attach(id, url, id.is_main());
            }
        }
    }

    fn detach(&mut self, id: FrameId) -> Option<FrameRecord> {
        self.frames.remove(&id)
    }

    fn get(&self, id: FrameId) -> Option<&FrameRecord> {
        self.frames.get(&id)
    }

    fn is_attached(&self, id: FrameId) -> bool {
        self.frames.contains_key(&id)
    }

    fn frame_ids(&self) -> Vec<FrameId> {
        self.frames.keys().copied().collect()
    }

    /// Returns `true` only the first time for the current document.
    fn mark_installed(&mut self, id: FrameId, target: InterceptionTarget) -> bool {
        match self.frames.get_mut(&id) {
            Some(record) => record.installed.insert(target),
            None => false,
        }
    }

    fn clear_installed(&mut self, id: FrameId, target: InterceptionTarget) -> bool {
        match self.frames.get_mut(&id) {
            Some(record) => record.installed.remove(&target),
            None => false,
        }
    }

    fn is_installed(&self, id: FrameId, target: InterceptionTarget) -> bool {
        self.frames
            .get(&id)
            .map(|r| r.installed.contains(&target))
            .unwrap_or(false)
    }

    fn record_sync(&mut self, id: FrameId, globals: PageGlobals) {
        if let Some(record) = self.frames.get_mut(&id) {
            record.synced = Some(globals);
        }
    }

    /// Drop every frame, e.g. on full reload.
    fn clear(&mut self) {
        self.frames.clear();
    }

    fn len(&self) -> usize {
        self.frames.len()
    }

    fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
