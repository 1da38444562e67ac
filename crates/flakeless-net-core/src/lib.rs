//! Shared networking pieces for the flakeless ID server.
//!
//! - [`ClientFrame`] / [`ServerFrame`]: the JSON messages exchanged over a
//!   connection, each carried in one length-delimited frame.
//! - [`FrameCodec`]: the `tokio_util` codec for those frames.
//! - [`Client`]: connects to one namespace of a server and requests ordered
//!   batches of IDs.

mod client;
mod common;

pub use client::*;
pub use common::*;
// Public re-export so downstream crates can reach the generator types via
// `flakeless_net_core::flakeless`
pub use flakeless;
