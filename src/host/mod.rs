//! # Host Collaborators
//!
//! The router never touches a browser directly. Everything it needs from the
//! host page goes through the traits here:
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │ NavigationController │
//!                 └──────────┬───────────┘
//!     ┌──────────┬───────────┼────────────┬────────────┬───────────┐
//!     ▼          ▼           ▼            ▼            ▼           ▼
//!    Dom     Location  TransitionEngine Animator   Components  Announcer
//!  (classes, (pathname, (route,        (tweens)   (overlay,   (pub/sub)
//!   content)  origin)    silent route)             gallery,
//!                                                  detail view)
//! ```
//!
//! [`memory`] has in-process implementations of all of them, used by the CLI
//! and the tests.

pub mod memory;

use std::time::Duration;

use crate::core::document::PageMetadata;
use crate::core::lifecycle::Announcement;
use crate::core::nav_tree::NavigationTree;

/// Elements the router toggles classes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Html,
    Body,
}

/// DOM query/manipulation facade.
pub trait Dom: Send + Sync {
    fn add_class(&self, element: Element, class: &str);

    fn remove_classes(&self, element: Element, classes: &[String]);

    /// Sets the main content container's `id`.
    fn set_main_id(&self, id: &str);

    /// Points the root/logo link at `href`.
    fn set_root_href(&self, href: &str);

    /// Replaces the live page container's inner markup.
    fn replace_page_content(&self, markup: &str);

    /// Navigation tree from the nav element's metadata.
    fn nav_tree(&self) -> NavigationTree;

    /// `data-*` metadata of the live page container.
    fn page_metadata(&self) -> PageMetadata;

    /// Removes the bootstrap nav/page data elements once the first page is up.
    fn detach_bootstrap_data(&self);

    fn root_panel_scroll_top(&self) -> f64;

    fn set_root_panel_scroll_top(&self, top: f64);
}

/// `window.location`.
pub trait Location: Send + Sync {
    fn pathname(&self) -> String;

    fn origin(&self) -> String;

    /// Hard, full-page navigation.
    fn assign(&self, url: &str);
}

/// The page controller that actually performs transitions and emits
/// lifecycle events back to the router.
pub trait TransitionEngine: Send + Sync {
    /// Animated, history-pushing navigation.
    fn route(&self, path: &str);

    /// Navigation with no visible transition. `on_complete` fires when done.
    fn route_silently(&self, path: &str, on_complete: Box<dyn FnOnce() + Send>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    EaseInOutCubic,
}

impl Easing {
    /// Maps progress `t` in `[0, 1]` onto the curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    pub duration: Duration,
    pub easing: Easing,
}

impl Tween {
    /// Value at progress `t` in `[0, 1]`.
    pub fn value_at(&self, t: f64) -> f64 {
        self.from + (self.to - self.from) * self.easing.apply(t)
    }
}

/// Tween/animation engine.
pub trait Animator: Send + Sync {
    fn tween(
        &self,
        tween: Tween,
        on_update: Box<dyn FnMut(f64) + Send>,
        on_complete: Box<dyn FnOnce() + Send>,
    );
}

/// Sibling UI components the router pokes during back/forward handling.
pub trait Components: Send + Sync {
    /// Whether the detail ("project") view is showing.
    fn detail_active(&self) -> bool;

    /// Opens the detail view for the tile linking to `path`, the same way a
    /// click on that tile would. Returns false when no tile matches.
    fn open_detail(&self, path: &str) -> bool;

    fn close_overlay(&self);

    fn close_gallery(&self);
}

/// Publish side of the announcement bus.
pub trait Announcer: Send + Sync {
    fn publish(&self, announcement: &Announcement);
}
