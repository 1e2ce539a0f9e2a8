//! `text/parameters` bodies (WFD §6.1.1).
//!
//! GET_PARAMETER requests carry a bare list of parameter names, one per
//! line. Everything else (SET_PARAMETER requests, replies to GET_PARAMETER)
//! carries `name: value` lines:
//!
//! ```text
//! wfd_presentation_URL: rtsp://192.168.173.1/wfd1.0/streamid=0 none
//! wfd_trigger_method: SETUP
//! ```

use std::fmt;

pub const WFD_AUDIO_CODECS: &str = "wfd_audio_codecs";
pub const WFD_VIDEO_FORMATS: &str = "wfd_video_formats";
pub const WFD_3D_FORMATS: &str = "wfd_3d_video_formats";
pub const WFD_CONTENT_PROTECTION: &str = "wfd_content_protection";
pub const WFD_DISPLAY_EDID: &str = "wfd_display_edid";
pub const WFD_COUPLED_SINK: &str = "wfd_coupled_sink";
pub const WFD_CLIENT_RTP_PORTS: &str = "wfd_client_rtp_ports";
pub const WFD_I2C: &str = "wfd_I2C";
pub const WFD_UIBC_CAPABILITY: &str = "wfd_uibc_capability";
pub const WFD_CONNECTOR_TYPE: &str = "wfd_connector_type";
pub const WFD_STANDBY_RESUME_CAPABILITY: &str = "wfd_standby_resume_capability";
pub const WFD_PRESENTATION_URL: &str = "wfd_presentation_URL";
pub const WFD_TRIGGER_METHOD: &str = "wfd_trigger_method";

/// Parsed `text/parameters` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    parameters: Vec<String>,
    properties: Vec<(String, String)>,
}

impl Payload {
    /// Parse a GET_PARAMETER body: one parameter name per line.
    pub fn parse_parameters(body: &str) -> Self {
        Payload {
            parameters: body
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            properties: Vec::new(),
        }
    }

    /// Parse a `name: value` body. Lines without a colon are skipped.
    pub fn parse_properties(body: &str) -> Self {
        let properties = body
            .lines()
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                let name = name.trim();
                if name.is_empty() {
                    tracing::warn!(line, "skipping property without a name");
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect();
        Payload {
            parameters: Vec::new(),
            properties,
        }
    }

    /// Names queried by a GET_PARAMETER request.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn add_parameter(&mut self, name: &str) {
        self.parameters.push(name.to_string());
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn add_property(&mut self, name: &str, value: &str) {
        self.properties.push((name.to_string(), value.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.properties.is_empty()
    }

    /// The primary presentation URL (`wfd_presentation_URL: <url0> <url1>`).
    ///
    /// `none` means the source did not provide one.
    pub fn presentation_url(&self) -> Option<&str> {
        self.property(WFD_PRESENTATION_URL)?
            .split_whitespace()
            .next()
            .filter(|url| *url != "none")
    }

    pub fn trigger_method(&self) -> Option<TriggerMethod> {
        self.property(WFD_TRIGGER_METHOD)
            .and_then(TriggerMethod::parse)
    }

    pub fn to_body(&self) -> String {
        let mut body = String::new();
        for name in &self.parameters {
            body.push_str(name);
            body.push_str("\r\n");
        }
        for (name, value) in &self.properties {
            body.push_str(&format!("{}: {}\r\n", name, value));
        }
        body
    }
}

/// Value of `wfd_trigger_method` in an M5 request (WFD §6.4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMethod {
    Setup,
    Play,
    Pause,
    Teardown,
}

impl TriggerMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "SETUP" => Some(Self::Setup),
            "PLAY" => Some(Self::Play),
            "PAUSE" => Some(Self::Pause),
            "TEARDOWN" => Some(Self::Teardown),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Teardown => "TEARDOWN",
        })
    }
}
