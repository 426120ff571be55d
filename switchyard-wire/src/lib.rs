//! Wire-protocol bridge for the Switchyard dispatch engine.
//!
//! Adapts the three-phase connection protocol (head, body frames,
//! response frames) into a [`RequestContext`] that middleware and
//! handlers consume, and a [`Response`] that serializes back into frames.
//! Channel-backed implementations of the transport traits ship here so
//! drivers and tests can speak the protocol in memory.
//!
//! See `docs/ARCHITECTURE.md` §4 for the protocol walkthrough.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod protocol;
pub mod request;
pub mod response;

pub use protocol::{
    BodyFrame, ConnectionHead, ResponseFrame, WireError, WireReceiver, WireSender,
};
pub use request::{lenient_json, Pairs, RequestContext};
pub use response::{http_date, Response};
