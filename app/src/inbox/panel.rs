//! Notification panel state machine.
//!
//! Models the modal sheet without rendering it: open/close transitions,
//! the swipe-down dismiss gesture, and tap-to-open-target handoff. The
//! store only ever observes the `panel_visible` flag flipping.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use super::center::NotificationCenter;

/// Drag distance beyond which a release dismisses the panel, px.
pub const DISMISS_DISTANCE: f32 = 80.0;
/// Release velocity beyond which a flick dismisses the panel, px/ms.
pub const DISMISS_VELOCITY: f32 = 0.5;
/// Delay between closing the panel and handing the payload to the
/// deep-link handler, so the close animation can begin.
pub const ACTION_DISPATCH_DELAY: Duration = Duration::from_millis(300);

/// Routes a tapped notification's payload. Implemented outside this core.
pub trait DeepLinkHandler {
    fn handle_notification_action(&self, data: &serde_json::Value);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelPhase {
    Hidden,
    Open,
    /// Panel follows the finger; offset is the downward displacement, px.
    Dragging(f32),
}

pub struct NotificationPanel {
    center: Arc<NotificationCenter>,
    phase: Mutex<PanelPhase>,
}

impl NotificationPanel {
    pub fn new(center: Arc<NotificationCenter>) -> Self {
        Self {
            center,
            phase: Mutex::new(PanelPhase::Hidden),
        }
    }

    pub fn phase(&self) -> PanelPhase {
        *self.lock_phase()
    }

    pub fn open(&self) {
        *self.lock_phase() = PanelPhase::Open;
        self.center.set_panel_visible(true);
    }

    pub fn close(&self) {
        *self.lock_phase() = PanelPhase::Hidden;
        self.center.set_panel_visible(false);
    }

    pub fn backdrop_tap(&self) {
        self.close();
    }

    /// Track the finger during a vertical drag. Only downward movement
    /// is followed; upward drags are clamped at the open position. A
    /// drag on a hidden panel is ignored.
    pub fn drag_move(&self, dy: f32) {
        let mut phase = self.lock_phase();
        match *phase {
            PanelPhase::Hidden => {}
            PanelPhase::Open | PanelPhase::Dragging(_) => {
                *phase = PanelPhase::Dragging(dy.max(0.0));
            }
        }
    }

    /// End the drag. Dismisses when the displacement exceeds
    /// [`DISMISS_DISTANCE`] or the release velocity exceeds
    /// [`DISMISS_VELOCITY`]; otherwise springs back to fully open.
    /// Returns `true` when the panel closed.
    pub fn release(&self, velocity: f32) -> bool {
        let offset = {
            let phase = self.lock_phase();
            match *phase {
                PanelPhase::Dragging(offset) => offset,
                PanelPhase::Open => 0.0,
                PanelPhase::Hidden => return false,
            }
        };

        if offset > DISMISS_DISTANCE || velocity > DISMISS_VELOCITY {
            self.close();
            true
        } else {
            *self.lock_phase() = PanelPhase::Open;
            false
        }
    }

    /// Tap a list entry: mark it read, close the panel, and hand back
    /// the entry's payload for deferred deep-link dispatch. Unknown ids
    /// return `None` and leave the panel open.
    pub fn tap_item(&self, id: &str) -> Option<serde_json::Value> {
        let entry = self
            .center
            .notifications()
            .into_iter()
            .find(|n| n.id == id)?;
        self.center.mark_as_read(id);
        self.close();
        Some(entry.data)
    }

    /// Hand the payload to the deep-link handler after the close
    /// animation has had time to begin.
    pub async fn dispatch_action<H: DeepLinkHandler>(handler: &H, data: serde_json::Value) {
        tokio::time::sleep(ACTION_DISPATCH_DELAY).await;
        handler.handle_notification_action(&data);
    }

    /// "Mark all read" is shown only while something is unread.
    pub fn can_mark_all_read(&self) -> bool {
        self.center.unread_count() > 0
    }

    /// "Clear all" is shown only while the log is non-empty.
    pub fn can_clear_all(&self) -> bool {
        !self.center.is_empty()
    }

    fn lock_phase(&self) -> std::sync::MutexGuard<'_, PanelPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
