//! Ordered phase pipeline.
//!
//! The sequencer is the only place that decides which phase sees an
//! event. Everything a phase queues (replies, requests) is flushed to the
//! [`Delegate`] right after the phase returns, so arrival order is kept.

use std::sync::{Arc, Weak};

use crate::error::{Result, WfdError};
use crate::media::SinkMediaManager;
use crate::peer::{Delegate, Observer};
use crate::protocol::message::{Message, Request};
use crate::sink::SinkConfig;
use crate::state::establishment::SessionEstablishment;
use crate::state::init::InitPhase;
use crate::state::negotiation::CapabilityNegotiation;
use crate::state::streaming::Streaming;
use crate::state::{Inbound, Outstanding, Phase, PhaseContext, PhaseKind, Progress};
use crate::timer::{KeepAliveTimer, Timers};

/// Externally visible sequencer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// Built but not started.
    Idle,
    Running(PhaseKind),
    /// The session ended with a confirmed TEARDOWN.
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Running(usize),
    Completed,
    Failed,
}

/// Where an accepted inbound message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Active,
    /// The next phase, which takes over from a settled active phase.
    Next,
}

pub struct Sequencer {
    phases: Vec<Box<dyn Phase>>,
    stage: Stage,
    next_cseq: u32,
    outbox: Vec<Message>,
    outstanding: Vec<Outstanding>,
    timers: Timers,
    delegate: Arc<dyn Delegate>,
    media: Weak<dyn SinkMediaManager>,
    observer: Arc<dyn Observer>,
    config: Arc<SinkConfig>,
}

impl Sequencer {
    pub fn new(
        delegate: Arc<dyn Delegate>,
        media: Weak<dyn SinkMediaManager>,
        observer: Arc<dyn Observer>,
        config: Arc<SinkConfig>,
    ) -> Self {
        let keep_alive = KeepAliveTimer::new();
        let phases: Vec<Box<dyn Phase>> = vec![
            Box::new(InitPhase),
            Box::new(CapabilityNegotiation::default()),
            Box::new(SessionEstablishment::new(keep_alive.clone())),
            Box::new(Streaming::new(keep_alive)),
        ];

        Self {
            phases,
            stage: Stage::Idle,
            next_cseq: 1,
            outbox: Vec::new(),
            outstanding: Vec::new(),
            timers: Timers::new(delegate.clone()),
            delegate,
            media,
            observer,
            config,
        }
    }

    pub fn state(&self) -> SequencerState {
        match self.stage {
            Stage::Idle => SequencerState::Idle,
            Stage::Running(index) => SequencerState::Running(self.phases[index].kind()),
            Stage::Completed => SequencerState::Completed,
            Stage::Failed => SequencerState::Failed,
        }
    }

    pub fn active_phase(&self) -> Option<PhaseKind> {
        match self.stage {
            Stage::Running(index) => Some(self.phases[index].kind()),
            _ => None,
        }
    }

    /// CSeq the next outbound request will carry.
    pub fn peek_cseq(&self) -> u32 {
        self.next_cseq
    }

    /// Activate the first phase. Must be called once per sequencer.
    pub fn start(&mut self) {
        if self.stage != Stage::Idle {
            tracing::warn!(state = ?self.state(), "sequencer already started");
            return;
        }
        self.enter(0);
    }

    pub fn can_handle(&self, message: &Message) -> bool {
        self.route(message).is_some()
    }

    /// Route an inbound message. Returns `false`, leaving all state
    /// untouched, when [`can_handle`](Self::can_handle) would.
    pub fn handle(&mut self, message: Message) -> bool {
        let (Some(route), Stage::Running(active)) = (self.route(&message), self.stage) else {
            tracing::warn!(
                cseq = message.cseq(),
                state = ?self.state(),
                "message not legal in current phase"
            );
            return false;
        };

        let index = match route {
            Route::Active => active,
            Route::Next => {
                tracing::info!(
                    from = %self.phases[active].kind(),
                    to = %self.phases[active + 1].kind(),
                    "next phase takes over"
                );
                self.enter(active + 1);
                if self.stage != Stage::Running(active + 1) {
                    return true;
                }
                active + 1
            }
        };

        let inbound = match message {
            Message::Request(request) => Inbound::Request(request),
            Message::Response(response) => {
                let cseq = response.header.cseq;
                let Some(position) = self.outstanding.iter().position(|o| o.cseq == cseq) else {
                    return false;
                };
                let pending = self.outstanding.remove(position);
                self.timers.release(pending.timer);
                Inbound::Reply(pending.id, response)
            }
        };

        let result = self.with_phase(index, |phase, ctx| phase.handle(ctx, inbound));
        self.conclude(index, result);
        true
    }

    pub fn can_send(&self, request: &Request) -> bool {
        match self.stage {
            Stage::Running(index) => self.phases[index].outbound().contains(&request.id),
            _ => false,
        }
    }

    /// Hand an application command to the active phase, which stamps the
    /// next CSeq on it.
    pub fn send(&mut self, request: Request) -> bool {
        if !self.can_send(&request) {
            tracing::warn!(
                id = %request.id,
                state = ?self.state(),
                "command not legal in current phase"
            );
            return false;
        }
        let Stage::Running(index) = self.stage else {
            return false;
        };
        let result = self.with_phase(index, |phase, ctx| phase.send(ctx, request));
        self.conclude(index, result);
        true
    }

    /// Route a timer firing. Returns `true` when nothing in the session
    /// accounts for a timer this sequencer issued; the owner must then
    /// reset the session.
    pub fn handle_timeout_event(&mut self, timer_id: u32) -> bool {
        if !self.timers.fired(timer_id) {
            tracing::debug!(timer_id, "ignoring timer from a previous session");
            return false;
        }
        let Stage::Running(index) = self.stage else {
            return false;
        };

        if let Some(position) = self.outstanding.iter().position(|o| o.timer == timer_id) {
            let pending = self.outstanding.remove(position);
            self.fail(WfdError::ReplyTimeout { id: pending.id });
            return false;
        }

        match self.with_phase(index, |phase, ctx| phase.handle_timeout(ctx, timer_id)) {
            Some(result) => {
                self.conclude(index, result);
                false
            }
            None => {
                tracing::error!(
                    timer_id,
                    phase = %self.phases[index].kind(),
                    "timer not claimed by any phase"
                );
                true
            }
        }
    }

    /// Cancel every armed timer. Called before the sequencer is dropped.
    pub fn release_timers(&mut self) {
        self.timers.release_all();
        self.outstanding.clear();
    }

    fn route(&self, message: &Message) -> Option<Route> {
        let Stage::Running(index) = self.stage else {
            return None;
        };
        let active = &self.phases[index];

        match message {
            Message::Request(request) => {
                if active.inbound().contains(&request.id) {
                    return Some(Route::Active);
                }
                let next = self.phases.get(index + 1)?;
                (next.inbound().contains(&request.id) && active.is_settled()).then_some(Route::Next)
            }
            Message::Response(response) => self
                .outstanding
                .iter()
                .find(|o| o.cseq == response.header.cseq)
                .filter(|o| active.outbound().contains(&o.id))
                .map(|_| Route::Active),
        }
    }

    fn with_phase<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut dyn Phase, &mut PhaseContext<'_>) -> R,
    ) -> R {
        let mut ctx = PhaseContext {
            next_cseq: &mut self.next_cseq,
            outbox: &mut self.outbox,
            outstanding: &mut self.outstanding,
            timers: &mut self.timers,
            media: &self.media,
            config: &self.config,
        };
        let result = f(self.phases[index].as_mut(), &mut ctx);
        self.flush();
        result
    }

    fn flush(&mut self) {
        for message in self.outbox.drain(..) {
            self.delegate.send_message(&message);
        }
    }

    fn enter(&mut self, index: usize) {
        self.stage = Stage::Running(index);
        tracing::info!(phase = %self.phases[index].kind(), "phase started");
        let result = self.with_phase(index, |phase, ctx| phase.start(ctx));
        self.conclude(index, result);
    }

    fn conclude(&mut self, index: usize, result: Result<Progress>) {
        match result {
            Ok(Progress::Continue) => {}
            Ok(Progress::Completed) => self.advance(index),
            Err(error) => self.fail(error),
        }
    }

    fn advance(&mut self, index: usize) {
        tracing::info!(phase = %self.phases[index].kind(), "phase completed");
        if index + 1 < self.phases.len() {
            self.enter(index + 1);
            return;
        }
        self.stage = Stage::Completed;
        tracing::info!("session completed");
        self.observer.on_completed();
    }

    fn fail(&mut self, error: WfdError) {
        if matches!(self.stage, Stage::Completed | Stage::Failed) {
            return;
        }
        tracing::error!(%error, state = ?self.state(), "session failed");
        self.stage = Stage::Failed;
        self.observer.on_error(&error);
    }
}
