//! Sink capability answers for M3 (WFD §6.1).
//!
//! The source queries parameters by name; the sink answers each one it
//! knows with a single `name: value` line:
//!
//! ```text
//! wfd_audio_codecs: LPCM 00000003 00, AAC 00000001 00
//! wfd_video_formats: 00 00 02 10 0001FFFF 1FFFFFFF 00000FFF 00 0000 0000 00 none none
//! wfd_client_rtp_ports: RTP/AVP/UDP;unicast 19000 0 mode=play
//! wfd_content_protection: none
//! ```
//!
//! Values come from the media manager's [`Capabilities`], except the RTP
//! ports which are read from the manager on every query.

use crate::protocol::payload::{
    Payload, WFD_3D_FORMATS, WFD_AUDIO_CODECS, WFD_CLIENT_RTP_PORTS, WFD_CONNECTOR_TYPE,
    WFD_CONTENT_PROTECTION, WFD_COUPLED_SINK, WFD_DISPLAY_EDID, WFD_I2C,
    WFD_STANDBY_RESUME_CAPABILITY, WFD_UIBC_CAPABILITY, WFD_VIDEO_FORMATS,
};

/// Parameter values the sink advertises, verbatim as they go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub audio_codecs: String,
    pub video_formats: String,
    pub formats_3d: String,
    pub content_protection: String,
    pub display_edid: String,
    pub coupled_sink: String,
    pub i2c: String,
    pub uibc: String,
    pub connector_type: String,
    pub standby_resume: String,
}

impl Default for Capabilities {
    /// LPCM + AAC audio, CBP/CHP H.264 up to 1080p30, nothing optional.
    fn default() -> Self {
        Self {
            audio_codecs: "LPCM 00000003 00, AAC 00000001 00".to_string(),
            video_formats: "00 00 02 10 0001FFFF 1FFFFFFF 00000FFF 00 0000 0000 00 none none"
                .to_string(),
            formats_3d: "none".to_string(),
            content_protection: "none".to_string(),
            display_edid: "none".to_string(),
            coupled_sink: "none".to_string(),
            i2c: "none".to_string(),
            uibc: "none".to_string(),
            connector_type: "none".to_string(),
            standby_resume: "none".to_string(),
        }
    }
}

impl Capabilities {
    fn value_for(&self, name: &str, rtp_ports: (u16, u16)) -> Option<String> {
        let value = match name {
            WFD_AUDIO_CODECS => &self.audio_codecs,
            WFD_VIDEO_FORMATS => &self.video_formats,
            WFD_3D_FORMATS => &self.formats_3d,
            WFD_CONTENT_PROTECTION => &self.content_protection,
            WFD_DISPLAY_EDID => &self.display_edid,
            WFD_COUPLED_SINK => &self.coupled_sink,
            WFD_I2C => &self.i2c,
            WFD_UIBC_CAPABILITY => &self.uibc,
            WFD_CONNECTOR_TYPE => &self.connector_type,
            WFD_STANDBY_RESUME_CAPABILITY => &self.standby_resume,
            WFD_CLIENT_RTP_PORTS => return Some(client_rtp_ports(rtp_ports)),
            _ => return None,
        };
        Some(value.clone())
    }
}

/// `wfd_client_rtp_ports` value for the given (RTP0, RTP1) ports.
pub fn client_rtp_ports((rtp0, rtp1): (u16, u16)) -> String {
    format!("RTP/AVP/UDP;unicast {} {} mode=play", rtp0, rtp1)
}

/// Build the M3 reply body for the `requested` parameter names.
///
/// Unknown names are skipped, so the source sees only what the sink
/// supports.
pub fn answer_query(caps: &Capabilities, rtp_ports: (u16, u16), requested: &[String]) -> Payload {
    let mut payload = Payload::default();
    for name in requested {
        match caps.value_for(name, rtp_ports) {
            Some(value) => payload.add_property(name, &value),
            None => tracing::warn!(parameter = %name, "GET_PARAMETER: parameter not supported"),
        }
    }

    tracing::debug!(
        requested = requested.len(),
        answered = payload.properties().len(),
        "capability query answered"
    );
    payload
}
