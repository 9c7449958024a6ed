//! Alert fan-out: realtime rooms and the opt-in email channel.

pub mod email;
pub mod realtime;

pub use email::{alert_email, EmailSender, HttpEmailSender, NoopEmailSender};
pub use realtime::{alert_rooms, BroadcastPublisher, RealtimeEvent, RealtimePublisher};
