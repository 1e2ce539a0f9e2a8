//! Tag inbound requests with their WFD message identifier.
//!
//! | Method | Payload | Id |
//! |--------|---------|----|
//! | OPTIONS | any | M1 |
//! | GET_PARAMETER | parameter names listed | M3 |
//! | GET_PARAMETER | empty | M16 (keep-alive) |
//! | SET_PARAMETER | `wfd_presentation_URL` | M4 |
//! | SET_PARAMETER | `wfd_trigger_method` | M5 |
//! | SET_PARAMETER | neither | unknown |
//!
//! GET_PARAMETER doubles as capability query and keep-alive; the
//! empty parameter list is the only thing telling them apart.

use crate::error::{Result, WfdError};
use crate::protocol::message::{MessageId, Method, Request};
use crate::protocol::payload::{WFD_PRESENTATION_URL, WFD_TRIGGER_METHOD};

/// Set `request.id` from its method and payload.
///
/// Methods a source never sends to a sink are rejected with
/// [`WfdError::Unclassified`]; a SET_PARAMETER carrying neither a
/// presentation URL nor a trigger keeps [`MessageId::Unknown`].
pub fn classify(request: &mut Request) -> Result<()> {
    let id = match request.method {
        Method::Options => MessageId::M1,
        Method::GetParameter => {
            if request.payload.parameters().is_empty() {
                MessageId::M16
            } else {
                MessageId::M3
            }
        }
        Method::SetParameter => {
            if request.payload.has_property(WFD_PRESENTATION_URL) {
                MessageId::M4
            } else if request.payload.has_property(WFD_TRIGGER_METHOD) {
                MessageId::M5
            } else {
                MessageId::Unknown
            }
        }
        _ => {
            return Err(WfdError::Unclassified {
                method: request.method.to_string(),
            });
        }
    };

    request.id = id;
    Ok(())
}
