//! # Lifecycle
//!
//! Everything that can happen to a navigation, as plain data.
//!
//! The transition engine drives a cycle by emitting [`LifecycleEvent`]s in a
//! fixed order. The router tracks where it is with [`NavPhase`] and tells the
//! rest of the app what happened through [`Announcement`]s.
//!
//! ```text
//!            TransitionOut       RefreshDocument       TransitionIn
//!   Idle ──────────────► Out ─────────────► Refresh ─────────────► In ──► Idle
//!    │
//!    ├── SameTarget ──► SameTarget ──► Idle     (root link on the root page)
//!    └── popstate   ──► Pop        ──► Idle     (native back/forward)
//! ```

use crate::core::document::DocumentSnapshot;

/// Events emitted by the transition engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The outgoing page starts animating away.
    TransitionOut,
    /// New markup has arrived and should replace the page content.
    RefreshDocument { response: String },
    /// The incoming page starts animating in.
    TransitionIn,
    /// First page set up at bootstrap. Happens once.
    InitializedPage,
    /// The user triggered the page that is already displayed.
    SameTarget,
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::TransitionOut => "transition-out",
            LifecycleEvent::RefreshDocument { .. } => "refresh-document",
            LifecycleEvent::TransitionIn => "transition-in",
            LifecycleEvent::InitializedPage => "initialized-page",
            LifecycleEvent::SameTarget => "same-target",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavPhase {
    #[default]
    Idle,
    TransitionOut,
    ContentRefresh,
    TransitionIn,
    SameTarget,
    Pop,
}

/// App-wide, fire-and-forget notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// The root/logo link was clicked.
    RootClicked,
    /// The detail ("project") view closed.
    DetailViewEnded,
    /// The root index markup is ready for background hydration.
    RootFragmentReady(String),
    /// Content was swapped; payload is for analytics.
    DocumentRefreshed(DocumentSnapshot),
}

impl Announcement {
    pub fn name(&self) -> &'static str {
        match self {
            Announcement::RootClicked => "app--root",
            Announcement::DetailViewEnded => "app--project-ended",
            Announcement::RootFragmentReady(_) => "app--load-root",
            Announcement::DocumentRefreshed(_) => "app--analytics-push",
        }
    }
}

/// Which branch a popstate took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopOutcome {
    /// Listener not bound yet; nothing happened.
    Ignored,
    /// Matched a simple route; `identifier` went onto the main container.
    Simple { identifier: String },
    /// Detail path; `opened` is false when no tile matched.
    Detail { path: String, opened: bool },
}
