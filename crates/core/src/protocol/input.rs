use crate::error::{ParseErrorKind, Result, WfdError};
use crate::protocol::message::Message;

/// Largest body accepted; WFD parameter bodies are a few hundred bytes.
pub const MAX_BODY: usize = 64 * 1024;

/// Reassembles RTSP messages from arbitrarily fragmented input.
///
/// A message is complete once its header block (terminated by an empty
/// line) and `Content-Length` bytes of body have arrived. Chunks may split
/// a message anywhere or carry several messages at once.
#[derive(Debug, Default)]
pub struct InputHandler {
    buffer: Vec<u8>,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes received from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Take the next complete message out of the buffer.
    ///
    /// Returns `None` when more input is needed. A malformed message is
    /// consumed and reported as `Some(Err(..))` so the caller can log it and
    /// keep reading.
    pub fn next_message(&mut self) -> Option<Result<Message>> {
        let padding = self
            .buffer
            .iter()
            .take_while(|b| **b == b'\r' || **b == b'\n')
            .count();
        self.buffer.drain(..padding);

        let (head_end, separator) = find_header_end(&self.buffer)?;
        let head = String::from_utf8_lossy(&self.buffer[..head_end]).into_owned();
        let body_start = head_end + separator;

        let length = match content_length(&head) {
            Ok(length) => length,
            Err(e) => {
                self.buffer.drain(..body_start);
                return Some(Err(e));
            }
        };

        let Some(total) = body_start.checked_add(length) else {
            self.buffer.drain(..body_start);
            return Some(Err(WfdError::Parse {
                kind: ParseErrorKind::InvalidContentLength,
            }));
        };
        if self.buffer.len() < total {
            tracing::trace!(
                buffered = self.buffer.len(),
                needed = total,
                "waiting for message body"
            );
            return None;
        }

        let body = String::from_utf8_lossy(&self.buffer[body_start..total]).into_owned();
        self.buffer.drain(..total);
        Some(Message::parse(&head, &body))
    }

    /// Drop any partially received message.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Position of the blank line ending the header block, and its length.
fn find_header_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n");
    let lf = buffer.windows(2).position(|w| w == b"\n\n");
    match (crlf, lf) {
        (Some(c), Some(l)) if l < c => Some((l, 2)),
        (Some(c), _) => Some((c, 4)),
        (None, Some(l)) => Some((l, 2)),
        (None, None) => None,
    }
}

fn content_length(head: &str) -> Result<usize> {
    let Some(value) = head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("Content-Length")
            .then_some(value.trim())
    }) else {
        return Ok(0);
    };

    let invalid = || WfdError::Parse {
        kind: ParseErrorKind::InvalidContentLength,
    };
    let length: usize = value.parse().map_err(|_| invalid())?;
    if length > MAX_BODY {
        tracing::warn!(length, "Content-Length over the body limit");
        return Err(invalid());
    }
    Ok(length)
}
