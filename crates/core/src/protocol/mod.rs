//! WFD flavoured RTSP messages (WFD §6).
//!
//! A WFD session runs RTSP in both directions over one TCP connection: the
//! source acts as client for M1, M3, M4, M5 and M16, the sink for M2, M6,
//! M7, M8 and M9.
//!
//! ```text
//! source                               sink
//!   | -- M1  OPTIONS ---------------------> |
//!   | <--------------------- M2  OPTIONS -- |
//!   | -- M3  GET_PARAMETER (caps) --------> |
//!   | -- M4  SET_PARAMETER (URL, formats) > |
//!   | -- M5  SET_PARAMETER (trigger) -----> |
//!   | <--------------------- M6  SETUP ---- |
//!   | <--------------------- M7  PLAY ----- |
//!   | -- M16 GET_PARAMETER (keep-alive) --> |
//!   | <--------------------- M9  PAUSE ---- |
//!   | <--------------------- M8  TEARDOWN - |
//! ```
//!
//! This module holds the message model ([`message`], [`payload`]), input
//! reassembly ([`input`]), the request [`classifier`] and the sink's
//! [`capabilities`] answers.

pub mod capabilities;
pub mod classifier;
pub mod input;
pub mod message;
pub mod payload;

pub use input::InputHandler;
pub use message::{Header, Message, MessageId, Method, Request, Response};
pub use payload::{Payload, TriggerMethod};
