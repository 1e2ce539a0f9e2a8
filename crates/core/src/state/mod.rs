//! Sink protocol state machine.
//!
//! A session is four ordered phases, each owning the message ids legal
//! while it is active:
//!
//! | Phase | Accepts | Sends | Completes when |
//! |-------|---------|-------|----------------|
//! | [`init`] | M1 | — | M1 answered |
//! | [`negotiation`] | M3 | M2 | the source moves on to M4/M5 |
//! | [`establishment`] | M4, M5 | M6 | SETUP reply carries a session id |
//! | [`streaming`] | M4, M5, M16 | M7, M8, M9 | TEARDOWN confirmed |
//!
//! The [`Sequencer`] owns the phases, gates traffic by those id sets and
//! moves to the next phase when the active one completes.

pub mod establishment;
pub mod init;
pub mod negotiation;
pub mod sequencer;
pub mod streaming;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{Result, WfdError};
use crate::media::SinkMediaManager;
use crate::protocol::message::{Message, MessageId, Request, Response};
use crate::sink::SinkConfig;
use crate::timer::Timers;

pub use sequencer::{Sequencer, SequencerState};

/// Which of the four sink phases a handler implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Init,
    CapabilityNegotiation,
    SessionEstablishment,
    Streaming,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::CapabilityNegotiation => "capability negotiation",
            Self::SessionEstablishment => "session establishment",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful phase step. Failure is the `Err` side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Completed,
}

/// What the sequencer hands a phase.
#[derive(Debug)]
pub enum Inbound {
    /// A classified request from the source.
    Request(Request),
    /// The source's reply to a request this phase issued.
    Reply(MessageId, Response),
}

/// A request waiting for its reply.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Outstanding {
    pub cseq: u32,
    pub id: MessageId,
    pub timer: u32,
}

/// Everything a phase may touch while handling one event.
///
/// Borrowed from the sequencer for the duration of a single call.
pub struct PhaseContext<'a> {
    pub(crate) next_cseq: &'a mut u32,
    pub(crate) outbox: &'a mut Vec<Message>,
    pub(crate) outstanding: &'a mut Vec<Outstanding>,
    pub(crate) timers: &'a mut Timers,
    pub(crate) media: &'a Weak<dyn SinkMediaManager>,
    pub(crate) config: &'a SinkConfig,
}

impl PhaseContext<'_> {
    /// Queue a reply to the source.
    pub fn reply(&mut self, response: Response) {
        tracing::debug!(
            status = response.status,
            cseq = response.header.cseq,
            "reply queued"
        );
        self.outbox.push(Message::Response(response));
    }

    /// Queue a request to the source.
    ///
    /// Stamps the next CSeq, remembers the request until its reply arrives
    /// and arms a reply timer for it. Returns the CSeq used.
    pub fn issue(&mut self, mut request: Request) -> u32 {
        let cseq = *self.next_cseq;
        *self.next_cseq += 1;

        request.header.cseq = cseq;
        if request.header.get("User-Agent").is_none() {
            request.header.set("User-Agent", &self.config.user_agent);
        }

        let timer = self.timers.arm(self.config.reply_timeout_secs);
        self.outstanding.push(Outstanding {
            cseq,
            id: request.id,
            timer,
        });

        tracing::debug!(id = %request.id, method = %request.method, cseq, "request issued");
        self.outbox.push(Message::Request(request));
        cseq
    }

    /// The media manager, if the application still holds it.
    pub fn media(&self) -> Result<Arc<dyn SinkMediaManager>> {
        self.media.upgrade().ok_or(WfdError::MediaGone)
    }

    pub fn timers(&mut self) -> &mut Timers {
        &mut *self.timers
    }

    pub fn config(&self) -> &SinkConfig {
        self.config
    }
}

/// One phase of the sink protocol.
///
/// The sequencer only calls [`handle`](Self::handle) and
/// [`send`](Self::send) with ids from [`inbound`](Self::inbound) and
/// [`outbound`](Self::outbound), so implementations never see traffic that
/// belongs to another phase.
pub trait Phase: Send {
    fn kind(&self) -> PhaseKind;

    /// Request ids the source may send while this phase is active.
    fn inbound(&self) -> &'static [MessageId];

    /// Request ids the sink may send while this phase is active.
    fn outbound(&self) -> &'static [MessageId] {
        &[]
    }

    /// Called when the phase becomes active.
    fn start(&mut self, ctx: &mut PhaseContext<'_>) -> Result<Progress> {
        let _ = ctx;
        Ok(Progress::Continue)
    }

    fn handle(&mut self, ctx: &mut PhaseContext<'_>, inbound: Inbound) -> Result<Progress>;

    /// Send an application-issued command.
    fn send(&mut self, ctx: &mut PhaseContext<'_>, request: Request) -> Result<Progress> {
        ctx.issue(request);
        Ok(Progress::Continue)
    }

    /// `None` if the timer is not this phase's; otherwise the step it
    /// causes.
    fn handle_timeout(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        timer_id: u32,
    ) -> Option<Result<Progress>> {
        let _ = (ctx, timer_id);
        None
    }

    /// Whether the phase has done all it must and may give way to a
    /// message that belongs to the next phase.
    fn is_settled(&self) -> bool {
        false
    }
}
