//! Error types for the WFD sink library.

use std::fmt;

use crate::protocol::MessageId;

/// Errors that can occur while driving a sink session.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Input**: [`Parse`](Self::Parse) — malformed RTSP text.
/// - **Classification**: [`Unclassified`](Self::Unclassified) — a request
///   whose method has no WFD role. Dropped, never fatal.
/// - **Phase**: [`Rejected`](Self::Rejected),
///   [`MissingHeader`](Self::MissingHeader),
///   [`MissingProperty`](Self::MissingProperty),
///   [`UnexpectedTrigger`](Self::UnexpectedTrigger),
///   [`FormatRejected`](Self::FormatRejected),
///   [`MissingSession`](Self::MissingSession) — protocol violations that
///   fail the whole session.
/// - **Liveness**: [`ReplyTimeout`](Self::ReplyTimeout),
///   [`KeepAliveExpired`](Self::KeepAliveExpired).
/// - **Collaborators**: [`MediaGone`](Self::MediaGone).
#[derive(Debug, thiserror::Error)]
pub enum WfdError {
    /// Failed to parse an RTSP message.
    #[error("RTSP parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// The request method does not map onto any WFD message.
    #[error("cannot identify request with method {method}")]
    Unclassified { method: String },

    /// The peer answered one of our requests with a non-200 status.
    #[error("{id} rejected by peer with status {status}")]
    Rejected { id: MessageId, status: u16 },

    /// A mandatory header is absent or lacks a required token.
    #[error("{id} is missing mandatory header {header}")]
    MissingHeader { id: MessageId, header: &'static str },

    /// A mandatory `text/parameters` property is absent or malformed.
    #[error("{id} is missing mandatory property {property}")]
    MissingProperty { id: MessageId, property: &'static str },

    /// A trigger method arrived in a phase that cannot act on it.
    #[error("trigger {method} is not valid while {phase}")]
    UnexpectedTrigger { method: String, phase: &'static str },

    /// The media manager refused the formats selected by the source.
    #[error("media manager rejected the selected formats")]
    FormatRejected,

    /// The SETUP reply carried no session identifier.
    #[error("SETUP reply carried no session id")]
    MissingSession,

    /// The media manager was dropped while the session was still running.
    #[error("media manager is no longer available")]
    MediaGone,

    /// No reply arrived for an outbound request before its timer fired.
    #[error("no reply to {id} before timeout")]
    ReplyTimeout { id: MessageId },

    /// The source stopped sending keep-alives.
    #[error("keep-alive timer expired")]
    KeepAliveExpired,
}

/// Specific kind of RTSP parse failure.
#[derive(Debug)]
pub enum ParseErrorKind {
    /// Input was empty (no start line).
    EmptyMessage,
    /// Request line did not have the expected `Method URI Version` format.
    InvalidRequestLine,
    /// Status line did not have the expected `Version Code Reason` format.
    InvalidStatusLine,
    /// A header line did not contain a colon separator.
    InvalidHeader,
    /// The `CSeq` header is missing or not a number.
    InvalidCSeq,
    /// The `Content-Length` header is not a number.
    InvalidContentLength,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::InvalidRequestLine => write!(f, "invalid request line"),
            Self::InvalidStatusLine => write!(f, "invalid status line"),
            Self::InvalidHeader => write!(f, "invalid header"),
            Self::InvalidCSeq => write!(f, "missing or invalid CSeq"),
            Self::InvalidContentLength => write!(f, "invalid Content-Length"),
        }
    }
}

/// Convenience alias for `Result<T, WfdError>`.
pub type Result<T> = std::result::Result<T, WfdError>;
