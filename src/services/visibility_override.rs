//! Visibility/Focus Override.
//!
//! Makes the page believe it is a backgrounded, unfocused tab, which keeps it
//! from sending receipts and "active now" presence that it gates on being in
//! the foreground. Applied on demand, only while `block_active_status` or
//! `block_read_receipts` is on.
//!
//! [`DocumentVisibility`] is the native model of the page's `document` used by
//! the headless host; the injected JavaScript has the same apply/restore
//! contract, including the non-configurable bail-out.

use tracing::warn;

use crate::services::embedding::PageScript;
use crate::services::interceptor::Interceptor;
use crate::types::signal::InterceptionTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    Visible,
    Hidden,
}

impl VisibilityState {
    pub fn as_str(self) -> &'static str {
        match self {
            VisibilityState::Visible => "visible",
            VisibilityState::Hidden => "hidden",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    AlreadyApplied,
    /// The page froze the descriptors first. State is left untouched.
    SkippedNonConfigurable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    NotApplied,
}

/// The page-visible accessor for `hidden`/`visibilityState`/`hasFocus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accessor {
    /// Reads the browser's real state.
    Native,
    /// Reports a backgrounded, unfocused tab.
    Backgrounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Descriptor {
    accessor: Accessor,
    configurable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedDescriptors {
    hidden: Descriptor,
    visibility_state: Descriptor,
    has_focus: Descriptor,
}

/// A page document's visibility surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentVisibility {
    native_hidden: bool,
    native_focused: bool,
    hidden: Descriptor,
    visibility_state: Descriptor,
    has_focus: Descriptor,
    saved: Option<SavedDescriptors>,
    events_delivered: u32,
}

impl DocumentVisibility {
    /// A visible, focused document with configurable descriptors.
    pub fn foreground() -> Self {
        let native = Descriptor {
            accessor: Accessor::Native,
            configurable: true,
        };
        Self {
            native_hidden: false,
            native_focused: true,
            hidden: native,
            visibility_state: native,
            has_focus: native,
            saved: None,
            events_delivered: 0,
        }
    }

    /// A document whose page already made the descriptors non-configurable.
    pub fn frozen() -> Self {
        let mut doc = Self::foreground();
        doc.hidden.configurable = false;
        doc.visibility_state.configurable = false;
        doc.has_focus.configurable = false;
        doc
    }

    pub fn hidden(&self) -> bool {
        match self.hidden.accessor {
            Accessor::Native => self.native_hidden,
            Accessor::Backgrounded => true,
        }
    }

    pub fn visibility_state(&self) -> VisibilityState {
        let hidden = match self.visibility_state.accessor {
            Accessor::Native => self.native_hidden,
            Accessor::Backgrounded => true,
        };
        if hidden {
            VisibilityState::Hidden
        } else {
            VisibilityState::Visible
        }
    }

    pub fn has_focus(&self) -> bool {
        match self.has_focus.accessor {
            Accessor::Native => self.native_focused,
            Accessor::Backgrounded => false,
        }
    }

    pub fn is_overridden(&self) -> bool {
        self.saved.is_some()
    }

    /// Visibility-change events page listeners have observed.
    pub fn events_delivered(&self) -> u32 {
        self.events_delivered
    }

    /// The browser's real state changed (window minimised, focus lost...).
    pub fn set_native(&mut self, hidden: bool, focused: bool) {
        let changed = hidden != self.native_hidden;
        self.native_hidden = hidden;
        self.native_focused = focused;
        if changed {
            self.dispatch_visibility_change();
        }
    }

    /// Fire `visibilitychange`. Returns whether page listeners saw it.
    pub fn dispatch_visibility_change(&mut self) -> bool {
        if self.is_overridden() {
            return false;
        }
        self.events_delivered += 1;
        true
    }

    pub fn apply(&mut self) -> ApplyOutcome {
        if self.saved.is_some() {
            return ApplyOutcome::AlreadyApplied;
        }
        if !self.hidden.configurable
            || !self.visibility_state.configurable
            || !self.has_focus.configurable
        {
            warn!("visibility properties are not configurable; override skipped");
            return ApplyOutcome::SkippedNonConfigurable;
        }
        self.saved = Some(SavedDescriptors {
            hidden: self.hidden,
            visibility_state: self.visibility_state,
            has_focus: self.has_focus,
        });
        let patched = Descriptor {
            accessor: Accessor::Backgrounded,
            configurable: true,
        };
        self.hidden = patched;
        self.visibility_state = patched;
        self.has_focus = patched;
        ApplyOutcome::Applied
    }

    /// Safe without a prior `apply()`.
    pub fn restore(&mut self) -> RestoreOutcome {
        match self.saved.take() {
            Some(saved) => {
                self.hidden = saved.hidden;
                self.visibility_state = saved.visibility_state;
                self.has_focus = saved.has_focus;
                RestoreOutcome::Restored
            }
            None => RestoreOutcome::NotApplied,
        }
    }
}

impl Default for DocumentVisibility {
    fn default() -> Self {
        Self::foreground()
    }
}

/// Installs the visibility override into frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct VisibilityOverride;

impl Interceptor for VisibilityOverride {
    fn target(&self) -> InterceptionTarget {
        InterceptionTarget::VisibilityApi
    }

    fn install_script(&self) -> PageScript {
        PageScript::ApplyVisibilityOverride
    }

    fn uninstall_script(&self) -> Option<PageScript> {
        Some(PageScript::RestoreVisibilityOverride)
    }
}
