//! # Wire Protocol
//!
//! Every message is a JSON object tagged by its `event` field, carried in one
//! length-delimited frame (see [`crate::FrameCodec`]).
//!
//! ## Client to server
//!
//! ```text
//! {"event":"connect","namespace":"/a"}          must be the first frame
//! {"event":"request","ack":7,"amount":3}
//! ```
//!
//! ## Server to client
//!
//! ```text
//! {"event":"connected"}
//! {"event":"error","message":"Invalid namespace"}   then the server closes
//! {"event":"ack","ack":7,"ids":["…","…",null]}
//! {"event":"rejected","ack":7,"reason":"…"}
//! ```
//!
//! A `null` inside `ids` marks a position where the generator reported
//! sequence exhaustion for that millisecond. Batches are never shortened:
//! the list always has exactly `amount` entries.

use serde::{Deserialize, Serialize};

/// The IDs answering one request, in generation order. `None` marks an
/// exhausted slot.
pub type Batch = Vec<Option<String>>;

/// Message carried by the `error` frame sent for an unbound namespace.
pub const INVALID_NAMESPACE: &str = "Invalid namespace";

/// Namespace used when an address names none.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Upper bound on a single encoded frame.
pub const MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Frames sent by a [`crate::Client`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Selects the channel this connection talks to.
    Connect { namespace: String },
    /// Asks for `amount` IDs. `ack` is echoed in the answer.
    Request { ack: u64, amount: u32 },
}

/// Frames sent by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Handshake accepted.
    Connected,
    /// Connection-level failure. The server closes after sending it.
    Error { message: String },
    /// Answer to the request tagged `ack`.
    Ack { ack: u64, ids: Batch },
    /// The request tagged `ack` was refused, e.g. for an oversized amount.
    Rejected { ack: u64, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_are_tagged_by_event() {
        let connect = ClientFrame::Connect {
            namespace: "/a".to_owned(),
        };
        assert_eq!(
            serde_json::to_string(&connect).unwrap(),
            r#"{"event":"connect","namespace":"/a"}"#
        );

        let request = ClientFrame::Request { ack: 7, amount: 3 };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"event":"request","ack":7,"amount":3}"#
        );
    }

    #[test]
    fn server_frames_are_tagged_by_event() {
        assert_eq!(
            serde_json::to_string(&ServerFrame::Connected).unwrap(),
            r#"{"event":"connected"}"#
        );

        let ack = ServerFrame::Ack {
            ack: 1,
            ids: vec![Some("00000000y00".to_owned()), None],
        };
        assert_eq!(
            serde_json::to_string(&ack).unwrap(),
            r#"{"event":"ack","ack":1,"ids":["00000000y00",null]}"#
        );

        let error = ServerFrame::Error {
            message: INVALID_NAMESPACE.to_owned(),
        };
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"event":"error","message":"Invalid namespace"}"#
        );
    }

    #[test]
    fn parses_frames_from_json() {
        let frame: ServerFrame =
            serde_json::from_str(r#"{"event":"rejected","ack":9,"reason":"too many"}"#).unwrap();
        assert_eq!(
            frame,
            ServerFrame::Rejected {
                ack: 9,
                reason: "too many".to_owned()
            }
        );

        let unknown = serde_json::from_str::<ClientFrame>(r#"{"event":"disconnect"}"#);
        assert!(unknown.is_err());

        let negative = serde_json::from_str::<ClientFrame>(r#"{"event":"request","ack":1,"amount":-1}"#);
        assert!(negative.is_err());
    }
}
