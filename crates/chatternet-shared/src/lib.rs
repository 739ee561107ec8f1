//! # chatternet-shared
//!
//! Domain types shared between the Chatternet messaging server and client:
//! user/thread/message models, the HTTP wire DTOs, and the notification
//! preference model with its delivery-policy evaluation.

pub mod constants;
pub mod prefs;
pub mod protocol;
pub mod types;

pub use prefs::{ChannelToggles, DndWindow, NotificationDecision, NotificationPreferences};
pub use types::{Message, Thread, ThreadId, User, UserId};
