//! Bell indicator state.
//!
//! Watches the unread count and decides when the bell should play its
//! shake animation: on increases only, never on a decrease or an
//! unchanged count.

pub struct BellIndicator {
    last_count: usize,
}

impl BellIndicator {
    pub fn new() -> Self {
        Self { last_count: 0 }
    }

    /// Feed the current unread count. Returns `true` when the shake
    /// animation should play once.
    pub fn observe(&mut self, unread: usize) -> bool {
        let shake = unread > self.last_count;
        self.last_count = unread;
        shake
    }

    /// Badge text: hidden at zero, capped at "99+".
    pub fn badge_label(count: usize) -> Option<String> {
        match count {
            0 => None,
            c if c > 99 => Some("99+".into()),
            c => Some(c.to_string()),
        }
    }
}

impl Default for BellIndicator {
    fn default() -> Self {
        Self::new()
    }
}
