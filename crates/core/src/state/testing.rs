//! Doubles shared by the phase and sequencer unit tests.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::WfdError;
use crate::media::{SelectedFormats, SinkMediaManager};
use crate::peer::{Delegate, Observer};
use crate::protocol::message::{Message, MessageId, Method, Request};
use crate::sink::SinkConfig;
use crate::state::{Outstanding, PhaseContext};
use crate::timer::Timers;

#[derive(Default)]
pub(crate) struct RecordingDelegate {
    pub sent: Mutex<Vec<Message>>,
    pub next_timer: Mutex<u32>,
    pub created: Mutex<Vec<(u32, u32)>>,
    pub released: Mutex<Vec<u32>>,
}

impl RecordingDelegate {
    pub fn take_sent(&self) -> Vec<Message> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Delegate for RecordingDelegate {
    fn send_message(&self, message: &Message) {
        self.sent.lock().push(message.clone());
    }

    fn create_timer(&self, seconds: u32) -> u32 {
        let mut next = self.next_timer.lock();
        *next += 1;
        self.created.lock().push((*next, seconds));
        *next
    }

    fn release_timer(&self, timer_id: u32) {
        self.released.lock().push(timer_id);
    }
}

#[derive(Debug, Default)]
pub(crate) struct MediaState {
    pub session: String,
    pub url: String,
    pub formats: Vec<SelectedFormats>,
    pub reject_formats: bool,
    pub plays: usize,
    pub pauses: usize,
    pub teardowns: usize,
}

#[derive(Debug, Default)]
pub(crate) struct FakeMedia {
    pub state: Mutex<MediaState>,
}

impl SinkMediaManager for FakeMedia {
    fn session(&self) -> String {
        self.state.lock().session.clone()
    }

    fn set_session(&self, session: &str) {
        self.state.lock().session = session.to_string();
    }

    fn presentation_url(&self) -> String {
        self.state.lock().url.clone()
    }

    fn set_presentation_url(&self, url: &str) {
        self.state.lock().url = url.to_string();
    }

    fn play(&self) {
        self.state.lock().plays += 1;
    }

    fn pause(&self) {
        self.state.lock().pauses += 1;
    }

    fn teardown(&self) {
        self.state.lock().teardowns += 1;
    }

    fn rtp_ports(&self) -> (u16, u16) {
        (19000, 0)
    }

    fn select_formats(&self, formats: &SelectedFormats) -> bool {
        let mut state = self.state.lock();
        state.formats.push(formats.clone());
        !state.reject_formats
    }
}

#[derive(Default)]
pub(crate) struct CountingObserver {
    pub completed: Mutex<usize>,
    pub errors: Mutex<Vec<String>>,
}

impl Observer for CountingObserver {
    fn on_completed(&self) {
        *self.completed.lock() += 1;
    }

    fn on_error(&self, error: &WfdError) {
        self.errors.lock().push(error.to_string());
    }
}

/// Owns what a [`PhaseContext`] borrows so a phase can be driven alone.
pub(crate) struct Harness {
    pub cseq: u32,
    pub outbox: Vec<Message>,
    pub outstanding: Vec<Outstanding>,
    pub timers: Timers,
    pub delegate: Arc<RecordingDelegate>,
    pub media: Arc<FakeMedia>,
    weak_media: Weak<dyn SinkMediaManager>,
    pub config: SinkConfig,
}

impl Harness {
    pub fn new() -> Self {
        let delegate = Arc::new(RecordingDelegate::default());
        let media = Arc::new(FakeMedia::default());
        let media_dyn: Arc<dyn SinkMediaManager> = media.clone();
        Self {
            cseq: 1,
            outbox: Vec::new(),
            outstanding: Vec::new(),
            timers: Timers::new(delegate.clone()),
            delegate,
            weak_media: Arc::downgrade(&media_dyn),
            media,
            config: SinkConfig::default(),
        }
    }

    pub fn run<R>(&mut self, f: impl FnOnce(&mut PhaseContext<'_>) -> R) -> R {
        let mut ctx = PhaseContext {
            next_cseq: &mut self.cseq,
            outbox: &mut self.outbox,
            outstanding: &mut self.outstanding,
            timers: &mut self.timers,
            media: &self.weak_media,
            config: &self.config,
        };
        f(&mut ctx)
    }

    pub fn take_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }
}

/// Build an inbound request the way the classifier would leave it.
pub(crate) fn request(method: Method, id: MessageId, cseq: u32, body: &str) -> Request {
    let head = format!("{} rtsp://localhost/wfd1.0 RTSP/1.0\r\nCSeq: {}\r\n", method, cseq);
    let Ok(Message::Request(mut request)) = Message::parse(&head, body) else {
        panic!("test request must parse");
    };
    request.id = id;
    request
}
