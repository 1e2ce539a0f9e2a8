//! Application-side collaborators of a [`Sink`](crate::Sink).

use crate::error::WfdError;
use crate::protocol::message::Message;

/// Transport and timer services supplied by the application.
///
/// The sink performs no I/O: outbound messages are handed over for
/// serialization and sending, and timers are created here and reported
/// back through [`Sink::on_timer_event`](crate::Sink::on_timer_event).
pub trait Delegate: Send + Sync {
    /// Send a message to the source. `message.serialize()` yields the
    /// RTSP text.
    fn send_message(&self, message: &Message);

    /// Arm a one-shot timer firing after `seconds`. Returns its id.
    fn create_timer(&self, seconds: u32) -> u32;

    /// Cancel a timer created by [`create_timer`](Self::create_timer).
    fn release_timer(&self, timer_id: u32);
}

/// Receives the terminal outcome of a sink session.
///
/// Called synchronously, at most once per session attempt, before the
/// sink tears down media and resets itself.
pub trait Observer: Send + Sync {
    /// The session ended through a confirmed TEARDOWN.
    fn on_completed(&self) {}

    /// The session failed and is being torn down.
    fn on_error(&self, error: &WfdError) {
        let _ = error;
    }
}

/// Observer used when the application does not install one.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}
