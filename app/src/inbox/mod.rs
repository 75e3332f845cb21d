//! Notification inbox.
//!
//! A bounded, persisted, newest-first log of in-app notifications with
//! read-state tracking, plus the presentation state machines that
//! consume it: the panel (modal sheet with swipe-down dismissal) and
//! the bell indicator (shake on unread increase).

pub mod bell;
pub mod center;
pub mod panel;
pub mod types;

pub use bell::BellIndicator;
pub use center::NotificationCenter;
pub use panel::{DeepLinkHandler, NotificationPanel, PanelPhase};
pub use types::{AppNotification, MAX_NOTIFICATIONS, NotificationInput};
