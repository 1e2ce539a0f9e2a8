//! The sink session facade.

use std::sync::{Arc, Weak};

use crate::media::SinkMediaManager;
use crate::peer::{Delegate, NoopObserver, Observer};
use crate::protocol::InputHandler;
use crate::protocol::classifier::classify;
use crate::protocol::message::{Message, MessageId, Method, Request};
use crate::state::{PhaseKind, Sequencer, SequencerState};

/// `User-Agent` sent on sink-issued requests unless configured otherwise.
pub const USER_AGENT: &str = concat!("wfd-sink/", env!("CARGO_PKG_VERSION"));

/// Session tunables.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// How long the source gets to answer a sink-issued request.
    pub reply_timeout_secs: u32,
    /// Added to the session timeout before a missing keep-alive is fatal.
    pub keep_alive_grace_secs: u32,
    /// Used when the SETUP reply carries no `timeout=`.
    pub default_session_timeout_secs: u32,
    /// Upper bound on the timeout the source may ask for.
    pub max_session_timeout_secs: u32,
    /// Send PLAY as soon as the session is established.
    pub auto_play: bool,
    pub user_agent: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            reply_timeout_secs: 5,
            keep_alive_grace_secs: 5,
            default_session_timeout_secs: 60,
            max_session_timeout_secs: 3600,
            auto_play: false,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Sink side of one WFD control connection.
///
/// Feed it bytes from the source with
/// [`rtsp_data_received`](Self::rtsp_data_received) and timer firings with
/// [`on_timer_event`](Self::on_timer_event); everything it wants to send
/// goes out through the [`Delegate`].
///
/// When a session completes or fails the sink tears down the media
/// pipeline and resets itself. Call [`start`](Self::start) again to accept
/// a new session.
pub struct Sink {
    sequencer: Sequencer,
    input: InputHandler,
    delegate: Arc<dyn Delegate>,
    media: Weak<dyn SinkMediaManager>,
    observer: Arc<dyn Observer>,
    config: Arc<SinkConfig>,
}

impl Sink {
    pub fn new(delegate: Arc<dyn Delegate>, media: Weak<dyn SinkMediaManager>) -> Self {
        let observer: Arc<dyn Observer> = Arc::new(NoopObserver);
        let config = Arc::new(SinkConfig::default());
        Self {
            sequencer: Sequencer::new(
                delegate.clone(),
                media.clone(),
                observer.clone(),
                config.clone(),
            ),
            input: InputHandler::new(),
            delegate,
            media,
            observer,
            config,
        }
    }

    pub fn with_config(mut self, config: SinkConfig) -> Self {
        self.config = Arc::new(config);
        self.sequencer = self.new_sequencer();
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self.sequencer = self.new_sequencer();
        self
    }

    /// Wait for the source's M1. Call once per session.
    pub fn start(&mut self) {
        tracing::info!("sink session started");
        self.sequencer.start();
        self.settle();
    }

    /// Drop the current session without touching media.
    pub fn reset(&mut self) {
        self.sequencer.release_timers();
        self.sequencer = self.new_sequencer();
        self.input.clear();
        tracing::info!("sink session reset");
    }

    /// Consume a chunk of bytes from the control connection.
    pub fn rtsp_data_received(&mut self, data: &[u8]) {
        self.input.push(data);
        while let Some(parsed) = self.input.next_message() {
            match parsed {
                Ok(message) => self.message_parsed(message),
                Err(e) => tracing::warn!(error = %e, "dropping malformed RTSP message"),
            }
        }
    }

    /// Ask the source to start streaming (M7). `false` if no session is
    /// established or PLAY is not allowed right now.
    pub fn play(&mut self) -> bool {
        self.handle_command(Method::Play, MessageId::M7)
    }

    /// Ask the source to pause (M9).
    pub fn pause(&mut self) -> bool {
        self.handle_command(Method::Pause, MessageId::M9)
    }

    /// Ask the source to end the session (M8).
    pub fn teardown(&mut self) -> bool {
        self.handle_command(Method::Teardown, MessageId::M8)
    }

    /// Report that a timer created through the delegate fired.
    pub fn on_timer_event(&mut self, timer_id: u32) {
        if self.sequencer.handle_timeout_event(timer_id) {
            tracing::error!(timer_id, "unexpected timer, resetting session");
            self.reset_and_teardown_media();
            return;
        }
        self.settle();
    }

    pub fn state(&self) -> SequencerState {
        self.sequencer.state()
    }

    pub fn active_phase(&self) -> Option<PhaseKind> {
        self.sequencer.active_phase()
    }

    fn new_sequencer(&self) -> Sequencer {
        Sequencer::new(
            self.delegate.clone(),
            self.media.clone(),
            self.observer.clone(),
            self.config.clone(),
        )
    }

    fn message_parsed(&mut self, mut message: Message) {
        if let Message::Request(request) = &mut message {
            if let Err(e) = classify(request) {
                tracing::warn!(error = %e, "dropping request");
                return;
            }
            if request.id == MessageId::Unknown {
                tracing::warn!(
                    method = %request.method,
                    cseq = request.header.cseq,
                    "dropping unidentified request"
                );
                return;
            }
        }

        if !self.sequencer.can_handle(&message) {
            tracing::warn!(
                cseq = message.cseq(),
                request = message.is_request(),
                phase = ?self.sequencer.active_phase(),
                "dropping message not expected now"
            );
            return;
        }
        self.sequencer.handle(message);
        self.settle();
    }

    fn handle_command(&mut self, method: Method, id: MessageId) -> bool {
        let Some(request) = self.create_command(method, id) else {
            return false;
        };
        if !self.sequencer.can_send(&request) {
            tracing::warn!(%id, phase = ?self.sequencer.active_phase(), "command not allowed now");
            return false;
        }
        let sent = self.sequencer.send(request);
        self.settle();
        sent
    }

    fn create_command(&self, method: Method, id: MessageId) -> Option<Request> {
        let media = self.media.upgrade()?;
        let session = media.session();
        let url = media.presentation_url();
        if session.is_empty() || url.is_empty() {
            tracing::warn!(%id, "no established session to send command in");
            return None;
        }
        let mut request = Request::command(method, id, &url, &session);
        request.header.cseq = self.sequencer.peek_cseq();
        Some(request)
    }

    /// React to a terminal sequencer state. The observer has already been
    /// told by the sequencer.
    fn settle(&mut self) {
        match self.sequencer.state() {
            SequencerState::Completed => self.on_completed(),
            SequencerState::Failed => self.on_error(),
            _ => {}
        }
    }

    fn on_completed(&mut self) {
        tracing::info!("session completed, releasing media");
        self.reset_and_teardown_media();
    }

    fn on_error(&mut self) {
        tracing::warn!("session failed, releasing media");
        self.reset_and_teardown_media();
    }

    fn reset_and_teardown_media(&mut self) {
        if let Some(media) = self.media.upgrade() {
            media.teardown();
        }
        self.reset();
    }
}
