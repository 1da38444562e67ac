use crate::{ClientFrame, MAX_FRAME_LENGTH, ServerFrame};
use bytes::{Bytes, BytesMut};
use core::marker::PhantomData;
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Decodes server-bound frames and encodes client-bound ones.
pub type ServerCodec = FrameCodec<ClientFrame, ServerFrame>;

/// Decodes client-bound frames and encodes server-bound ones.
pub type ClientCodec = FrameCodec<ServerFrame, ClientFrame>;

/// Failure while reading or writing a frame.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("frame I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON payloads inside big-endian `u32` length-prefixed frames.
///
/// `In` is the type read off the wire, `Out` the type written to it.
pub struct FrameCodec<In, Out> {
    framing: LengthDelimitedCodec,
    _marker: PhantomData<fn(Out) -> In>,
}

impl<In, Out> FrameCodec<In, Out> {
    pub fn new() -> Self {
        Self {
            framing: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_LENGTH)
                .new_codec(),
            _marker: PhantomData,
        }
    }
}

impl<In, Out> Default for FrameCodec<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out> core::fmt::Debug for FrameCodec<In, Out> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameCodec").finish_non_exhaustive()
    }
}

impl<In: DeserializeOwned, Out> Decoder for FrameCodec<In, Out> {
    type Item = In;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.framing.decode(src)? {
            Some(frame) => Ok(Some(serde_json::from_slice(&frame)?)),
            None => Ok(None),
        }
    }
}

impl<In, Out: Serialize> Encoder<Out> for FrameCodec<In, Out> {
    type Error = CodecError;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = serde_json::to_vec(&item)?;
        self.framing.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}
