//! Media pipeline seam.
//!
//! The sink never touches audio or video itself. Everything the control
//! protocol learns (presentation URL, session id, selected formats) is
//! pushed into a [`SinkMediaManager`], and playback commands confirmed by
//! the source are forwarded to it.
//!
//! The manager is owned by the application; the sink only keeps a
//! [`Weak`](std::sync::Weak) reference to it.

use crate::protocol::capabilities::Capabilities;

/// Formats the source selected in an M4 request.
///
/// Values are the raw `wfd_video_formats` / `wfd_audio_codecs` strings;
/// interpreting them is the media pipeline's business.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedFormats {
    pub video: Option<String>,
    pub audio: Option<String>,
}

impl SelectedFormats {
    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }
}

/// Media pipeline driven by the sink.
///
/// Methods take `&self`; implementations use interior mutability for the
/// state they store.
pub trait SinkMediaManager: Send + Sync {
    /// Session id assigned by the source in the SETUP (M6) reply.
    /// Empty until the session is established.
    fn session(&self) -> String;

    fn set_session(&self, session: &str);

    /// URL the source told us to SETUP/PLAY (M4). Empty until known.
    fn presentation_url(&self) -> String;

    fn set_presentation_url(&self, url: &str);

    /// Source confirmed PLAY (M7 reply): start rendering.
    fn play(&self);

    /// Source confirmed PAUSE (M9 reply).
    fn pause(&self);

    /// Release every media resource. Called once per finished session.
    fn teardown(&self);

    /// Local (RTP0, RTP1) ports the pipeline listens on.
    fn rtp_ports(&self) -> (u16, u16);

    /// Capability values answered to M3 queries.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Apply the formats the source selected. Returning `false` rejects
    /// the M4 request and fails the session.
    fn select_formats(&self, formats: &SelectedFormats) -> bool {
        let _ = formats;
        true
    }
}
