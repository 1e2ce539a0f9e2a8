use std::fmt;

use crate::error::{ParseErrorKind, Result, WfdError};
use crate::protocol::payload::Payload;

/// Protocol version written on every start line.
pub const RTSP_VERSION: &str = "RTSP/1.0";

/// Option tag both peers must list in `Require`/`Public` (WFD §6.1).
pub const WFD_OPTION_TAG: &str = "org.wfa.wfd1.0";

/// RTSP method of a request.
///
/// Only the methods a WFD sink exchanges get their own variant; anything
/// else is kept verbatim in [`Other`](Self::Other) so the classifier can
/// report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Options,
    GetParameter,
    SetParameter,
    Setup,
    Play,
    Pause,
    Teardown,
    Other(String),
}

impl Method {
    pub fn parse(token: &str) -> Self {
        match token {
            "OPTIONS" => Self::Options,
            "GET_PARAMETER" => Self::GetParameter,
            "SET_PARAMETER" => Self::SetParameter,
            "SETUP" => Self::Setup,
            "PLAY" => Self::Play,
            "PAUSE" => Self::Pause,
            "TEARDOWN" => Self::Teardown,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Options => "OPTIONS",
            Self::GetParameter => "GET_PARAMETER",
            Self::SetParameter => "SET_PARAMETER",
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Teardown => "TEARDOWN",
            Self::Other(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WFD message identifier (WFD §6.4).
///
/// The identifier is a semantic role, not a wire field: requests do not
/// declare it, so inbound ones are tagged by the
/// [`classifier`](crate::protocol::classifier) and outbound ones by whoever
/// builds them.
///
/// | Group | Ids | Purpose |
/// |-------|-----|---------|
/// | discovery | M1, M2 | OPTIONS exchange in both directions |
/// | capabilities | M3, M4 | GET/SET_PARAMETER negotiation |
/// | session | M5, M6 | trigger + SETUP |
/// | streaming | M7, M8, M9, M16 | PLAY, TEARDOWN, PAUSE, keep-alive |
/// | auxiliary | M10–M15 | route, connector, standby, IDR, UIBC |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M7,
    M8,
    M9,
    M10,
    M11,
    M12,
    M13,
    M14,
    M15,
    M16,
    Unknown,
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            id => write!(f, "{:?}", id),
        }
    }
}

/// RTSP header block shared by requests and responses.
///
/// `CSeq` and `Session` get typed fields because every phase reads them;
/// all other headers stay as ordered (name, value) pairs.
/// `Content-Type`/`Content-Length` are derived from the payload and never
/// stored here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Sequence number pairing a request with its reply (RFC 2326 §12.17).
    pub cseq: u32,
    /// Session identifier, without the `;timeout=` suffix.
    pub session: Option<String>,
    /// `timeout` parameter of the `Session` header, in seconds.
    pub session_timeout: Option<u32>,
    pub fields: Vec<(String, String)>,
}

impl Header {
    /// Look up a header value by name (case-insensitive, per RFC 2326 §4.2).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.fields.push((name.to_string(), value.to_string()));
    }

    /// Whether a comma-separated header (`Public`, `Require`) lists `token`.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get(name)
            .is_some_and(|value| value.split(',').any(|t| t.trim() == token))
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&format!("CSeq: {}\r\n", self.cseq));
        if let Some(session) = &self.session {
            match self.session_timeout {
                Some(timeout) => {
                    out.push_str(&format!("Session: {};timeout={}\r\n", session, timeout))
                }
                None => out.push_str(&format!("Session: {}\r\n", session)),
            }
        }
        for (name, value) in &self.fields {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
    }
}

/// An RTSP request, inbound or outbound.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Request-URI (`*` for OPTIONS, the presentation URL for SETUP/PLAY...).
    pub uri: String,
    /// WFD role; [`MessageId::Unknown`] until classified or stamped.
    pub id: MessageId,
    pub header: Header,
    pub payload: Payload,
}

impl Request {
    pub fn new(method: Method, uri: &str) -> Self {
        Request {
            method,
            uri: uri.to_string(),
            id: MessageId::Unknown,
            header: Header::default(),
            payload: Payload::default(),
        }
    }

    /// Build a sink-issued playback command (M7 PLAY, M8 TEARDOWN, M9
    /// PAUSE) addressed to the presentation URL within `session`.
    ///
    /// The CSeq is left at 0; the sequencer stamps it when the command
    /// is sent.
    pub fn command(method: Method, id: MessageId, presentation_url: &str, session: &str) -> Self {
        let mut request = Request::new(method, presentation_url).with_id(id);
        request.header.session = Some(session.to_string());
        request
    }

    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.header.set(name, value);
        self
    }

    /// Serialize to the RTSP text wire format.
    pub fn serialize(&self) -> String {
        let mut out = format!("{} {} {}\r\n", self.method, self.uri, RTSP_VERSION);
        self.header.write_to(&mut out);
        write_payload(&self.payload, &mut out);
        out
    }
}

/// An RTSP response (RFC 2326 §7).
///
/// Uses a builder pattern — chain [`add_header`](Self::add_header) and
/// [`with_payload`](Self::with_payload), then call
/// [`serialize`](Self::serialize).
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub header: Header,
    pub payload: Payload,
}

impl Response {
    pub fn new(status: u16, reason: &str) -> Self {
        Response {
            status,
            reason: reason.to_string(),
            header: Header::default(),
            payload: Payload::default(),
        }
    }

    /// 200 OK.
    pub fn ok() -> Self {
        Self::new(200, "OK")
    }

    /// 303 See Other — WFD's answer to an unacceptable parameter set.
    pub fn see_other() -> Self {
        Self::new(303, "See Other")
    }

    /// 400 Bad Request — malformed or missing mandatory property.
    pub fn bad_request() -> Self {
        Self::new(400, "Bad Request")
    }

    /// 551 Option not supported — `Require` lacks the WFD option tag.
    pub fn option_not_supported() -> Self {
        Self::new(551, "Option not supported")
    }

    /// Echo the CSeq (and session, if any) of the request being answered.
    pub fn answering(mut self, request: &Request) -> Self {
        self.header.cseq = request.header.cseq;
        self.header.session = request.header.session.clone();
        self
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.header.set(name, value);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn serialize(&self) -> String {
        let mut out = format!("{} {} {}\r\n", RTSP_VERSION, self.status, self.reason);
        self.header.write_to(&mut out);
        write_payload(&self.payload, &mut out);
        out
    }
}

/// Either side of an RTSP exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    /// Parse one complete message: the header block (start line plus
    /// headers, without the blank line) and its already-sized body.
    pub fn parse(head: &str, body: &str) -> Result<Self> {
        let mut lines = head.lines();

        let start_line = lines
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or(WfdError::Parse {
                kind: ParseErrorKind::EmptyMessage,
            })?;

        let header = parse_header(lines)?;
        let parts: Vec<&str> = start_line.split_whitespace().collect();

        if start_line.starts_with("RTSP/") {
            if parts.len() < 2 {
                return Err(WfdError::Parse {
                    kind: ParseErrorKind::InvalidStatusLine,
                });
            }
            let status: u16 = parts[1].parse().map_err(|_| WfdError::Parse {
                kind: ParseErrorKind::InvalidStatusLine,
            })?;
            return Ok(Message::Response(Response {
                status,
                reason: parts[2..].join(" "),
                header,
                payload: Payload::parse_properties(body),
            }));
        }

        if parts.len() != 3 {
            return Err(WfdError::Parse {
                kind: ParseErrorKind::InvalidRequestLine,
            });
        }
        if parts[2] != RTSP_VERSION {
            tracing::warn!(version = parts[2], "peer sent non-RTSP/1.0 version");
        }

        let method = Method::parse(parts[0]);
        let payload = match method {
            Method::GetParameter => Payload::parse_parameters(body),
            _ => Payload::parse_properties(body),
        };

        Ok(Message::Request(Request {
            method,
            uri: parts[1].to_string(),
            id: MessageId::Unknown,
            header,
            payload,
        }))
    }

    pub fn header(&self) -> &Header {
        match self {
            Message::Request(request) => &request.header,
            Message::Response(response) => &response.header,
        }
    }

    pub fn cseq(&self) -> u32 {
        self.header().cseq
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    pub fn serialize(&self) -> String {
        match self {
            Message::Request(request) => request.serialize(),
            Message::Response(response) => response.serialize(),
        }
    }
}

fn parse_header<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Header> {
    let mut header = Header::default();
    let mut cseq = None;

    for line in lines {
        if line.trim().is_empty() {
            break;
        }

        let colon_pos = line.find(':').ok_or(WfdError::Parse {
            kind: ParseErrorKind::InvalidHeader,
        })?;
        let name = line[..colon_pos].trim();
        let value = line[colon_pos + 1..].trim();

        if name.eq_ignore_ascii_case("CSeq") {
            cseq = Some(value.parse::<u32>().map_err(|_| WfdError::Parse {
                kind: ParseErrorKind::InvalidCSeq,
            })?);
        } else if name.eq_ignore_ascii_case("Session") {
            // "ID;timeout=60" -> ("ID", Some(60))
            let mut parts = value.split(';');
            let id = parts.next().unwrap_or(value).trim();
            if !id.is_empty() {
                header.session = Some(id.to_string());
            }
            header.session_timeout = parts
                .filter_map(|param| param.trim().strip_prefix("timeout="))
                .find_map(|secs| secs.trim().parse().ok());
        } else if name.eq_ignore_ascii_case("Content-Length")
            || name.eq_ignore_ascii_case("Content-Type")
        {
            continue;
        } else {
            header.set(name, value);
        }
    }

    header.cseq = cseq.ok_or(WfdError::Parse {
        kind: ParseErrorKind::InvalidCSeq,
    })?;
    Ok(header)
}

fn write_payload(payload: &Payload, out: &mut String) {
    if payload.is_empty() {
        out.push_str("\r\n");
        return;
    }
    let body = payload.to_body();
    out.push_str("Content-Type: text/parameters\r\n");
    out.push_str(&format!("Content-Length: {}\r\n", body.len()));
    out.push_str("\r\n");
    out.push_str(&body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_options_request() {
        let head = "OPTIONS * RTSP/1.0\r\nCSeq: 1\r\nRequire: org.wfa.wfd1.0\r\n";
        let Message::Request(req) = Message::parse(head, "").unwrap() else {
            panic!("expected a request");
        };
        assert_eq!(req.method, Method::Options);
        assert_eq!(req.uri, "*");
        assert_eq!(req.header.cseq, 1);
        assert!(req.header.has_token("Require", WFD_OPTION_TAG));
        assert_eq!(req.id, MessageId::Unknown);
    }

    #[test]
    fn parse_reply_with_session_timeout() {
        let head = "RTSP/1.0 200 OK\r\nCSeq: 4\r\nSession: 6B8B4567;timeout=30\r\n";
        let Message::Response(resp) = Message::parse(head, "").unwrap() else {
            panic!("expected a response");
        };
        assert!(resp.is_ok());
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.header.session.as_deref(), Some("6B8B4567"));
        assert_eq!(resp.header.session_timeout, Some(30));
    }

    #[test]
    fn parse_get_parameter_lists_names() {
        let head = "GET_PARAMETER rtsp://localhost/wfd1.0 RTSP/1.0\r\nCSeq: 2\r\n";
        let body = "wfd_video_formats\r\nwfd_audio_codecs\r\n";
        let Message::Request(req) = Message::parse(head, body).unwrap() else {
            panic!("expected a request");
        };
        assert_eq!(
            req.payload.parameters(),
            ["wfd_video_formats", "wfd_audio_codecs"]
        );
    }

    #[test]
    fn missing_cseq_is_an_error() {
        assert!(Message::parse("OPTIONS * RTSP/1.0\r\nRequire: x\r\n", "").is_err());
    }

    #[test]
    fn invalid_request_line() {
        assert!(Message::parse("JUST_A_METHOD\r\nCSeq: 1\r\n", "").is_err());
    }

    #[test]
    fn header_lookup_case_insensitive() {
        let head = "RTSP/1.0 200 OK\r\ncseq: 42\r\npublic: SETUP, PLAY\r\n";
        let msg = Message::parse(head, "").unwrap();
        assert_eq!(msg.cseq(), 42);
        assert!(msg.header().has_token("Public", "PLAY"));
        assert!(!msg.header().has_token("Public", "PAUSE"));
    }

    #[test]
    fn serialize_request_with_session() {
        let mut req = Request::new(Method::Play, "rtsp://10.0.0.1/wfd1.0/streamid=0");
        req.header.cseq = 7;
        req.header.session = Some("abc".to_string());
        let s = req.serialize();
        assert!(s.starts_with("PLAY rtsp://10.0.0.1/wfd1.0/streamid=0 RTSP/1.0\r\n"));
        assert!(s.contains("CSeq: 7\r\n"));
        assert!(s.contains("Session: abc\r\n"));
        assert!(s.ends_with("\r\n\r\n"));
    }

    #[test]
    fn serialize_response_with_body() {
        let mut payload = Payload::default();
        payload.add_property("wfd_audio_codecs", "AAC 00000001 00");
        let resp = Response::ok().with_payload(payload);
        let s = resp.serialize();
        assert!(s.starts_with("RTSP/1.0 200 OK\r\n"));
        assert!(s.contains("Content-Type: text/parameters\r\n"));
        assert!(s.contains("Content-Length: 35\r\n"));
        assert!(s.ends_with("wfd_audio_codecs: AAC 00000001 00\r\n"));
    }
}
