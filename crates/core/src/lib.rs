//! Sink side of the Wi-Fi Display (Miracast) RTSP control protocol.
//!
//! The crate performs no I/O. An application wires a [`Sink`] to three
//! collaborators:
//!
//! - a [`Delegate`] that sends messages to the source and runs timers,
//! - a [`SinkMediaManager`] owning the audio/video pipeline,
//! - optionally an [`Observer`] told how each session ended.
//!
//! ```no_run
//! use std::sync::Arc;
//! # use wfd::{Delegate, SinkMediaManager};
//! # fn wire(delegate: Arc<dyn Delegate>, media: Arc<dyn SinkMediaManager>) {
//! let mut sink = wfd::Sink::new(delegate, Arc::downgrade(&media));
//! sink.start();
//! // Bytes read from the control socket:
//! sink.rtsp_data_received(b"OPTIONS * RTSP/1.0\r\nCSeq: 1\r\nRequire: org.wfa.wfd1.0\r\n\r\n");
//! # }
//! ```

pub mod error;
pub mod media;
pub mod peer;
pub mod protocol;
pub mod sink;
pub mod state;
pub mod timer;

pub use error::{Result, WfdError};
pub use media::{SelectedFormats, SinkMediaManager};
pub use peer::{Delegate, Observer};
pub use sink::{Sink, SinkConfig};
pub use state::{PhaseKind, SequencerState};
