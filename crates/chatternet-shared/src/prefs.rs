//! Notification preferences and the delivery-policy evaluation.
//!
//! The policy has two gates, evaluated in order: the channel gate (in-app
//! notifications disabled suppresses everything) and the DND gate (inside the
//! configured window both the record and the sound cue are suppressed).
//! Suppression only ever affects alerting; the message itself is always
//! stored.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Per-channel on/off toggles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelToggles {
    pub in_app: bool,
    pub sound: bool,
    pub email: bool,
}

impl Default for ChannelToggles {
    fn default() -> Self {
        Self {
            in_app: true,
            sound: false,
            email: false,
        }
    }
}

/// A do-not-disturb window expressed in minutes of the day.
///
/// The window is half-open `[start, end)` and wraps around midnight when
/// `start > end` (e.g. 22:00 -> 08:00 covers the night).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DndWindow {
    pub enabled: bool,
    pub start_minute: u16,
    pub end_minute: u16,
}

impl Default for DndWindow {
    fn default() -> Self {
        // 22:00 -> 08:00, disabled until the user opts in.
        Self {
            enabled: false,
            start_minute: 22 * 60,
            end_minute: 8 * 60,
        }
    }
}

impl DndWindow {
    /// Whether the given minute of the day falls inside the window.
    /// Always `false` while the window is disabled.
    pub fn contains(&self, minute_of_day: u16) -> bool {
        if !self.enabled {
            return false;
        }
        let (m, start, end) = (minute_of_day, self.start_minute, self.end_minute);
        if start <= end {
            start <= m && m < end
        } else {
            m >= start || m < end
        }
    }
}

/// A user's complete notification configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub channels: ChannelToggles,
    pub dnd: DndWindow,
}

/// Outcome of evaluating a notification event against the preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationDecision {
    /// Create no notification record at all.
    Suppress,
    /// Create a record; `sound` flags an audible cue on the active surface.
    Notify { sound: bool },
}

impl NotificationPreferences {
    /// Run both gates for an event arriving at `now`.
    ///
    /// The DND window is interpreted against the UTC minute of day: the
    /// preference model carries no user timezone, so callers wanting
    /// local-clock semantics must shift the window minutes when saving.
    pub fn evaluate(&self, now: DateTime<Utc>) -> NotificationDecision {
        if !self.channels.in_app {
            return NotificationDecision::Suppress;
        }

        let minute = (now.hour() * 60 + now.minute()) as u16;
        if self.dnd.contains(minute) {
            return NotificationDecision::Suppress;
        }

        NotificationDecision::Notify {
            sound: self.channels.sound,
        }
    }
}
