//! Framing codec for the async client.

use std::marker::PhantomData;
use std::mem::size_of;

use byteorder::{BigEndian, ByteOrder};
use ssh_encoding::{Decode, Encode};
use tokio_util::bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::error::AgentError;
use super::frame::{check_len, encode_frame, ensure_consumed, MAX_FRAME_LEN};

/// SSH framing codec.
///
/// This codec first reads an `u32` which indicates the length of the incoming
/// message. Then decodes the message using specified `Input` type.
///
/// The reverse transformation which appends the length of the encoded data
/// is also implemented for the given `Output` type.
///
/// Lengths of zero or above the configured maximum are rejected as soon as
/// the prefix arrives, without buffering the rest of the frame.
#[derive(Debug)]
pub struct Codec<Input, Output>
where
    Input: Decode,
    Output: Encode,
    AgentError: From<Input::Error>,
{
    max_frame_len: usize,
    _marker: PhantomData<(Input, Output)>,
}

impl<Input, Output> Codec<Input, Output>
where
    Input: Decode,
    Output: Encode,
    AgentError: From<Input::Error>,
{
    /// Codec accepting frames of up to `max_frame_len` bytes.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            max_frame_len,
            _marker: PhantomData,
        }
    }
}

impl<Input, Output> Default for Codec<Input, Output>
where
    Input: Decode,
    Output: Encode,
    AgentError: From<Input::Error>,
{
    fn default() -> Self {
        Self::new(MAX_FRAME_LEN)
    }
}

impl<Input, Output> Decoder for Codec<Input, Output>
where
    Input: Decode,
    Output: Encode,
    AgentError: From<Input::Error>,
{
    type Item = Input;
    type Error = AgentError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < size_of::<u32>() {
            return Ok(None);
        }

        let length = BigEndian::read_u32(&src[..size_of::<u32>()]) as usize;
        check_len(length, self.max_frame_len)?;

        let end = size_of::<u32>() + length;
        if src.len() < end {
            src.reserve(end - src.len());
            return Ok(None);
        }

        let mut bytes = &src[size_of::<u32>()..end];
        let message = Self::Item::decode(&mut bytes)?;
        ensure_consumed(bytes)?;
        src.advance(end);
        Ok(Some(message))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(AgentError::ConnectionClosed),
        }
    }
}

impl<Input, Output> Encoder<Output> for Codec<Input, Output>
where
    Input: Decode,
    Output: Encode,
    AgentError: From<Input::Error>,
{
    type Error = AgentError;

    fn encode(&mut self, item: Output, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = encode_frame(&item, self.max_frame_len)?;
        dst.put(&*bytes);

        Ok(())
    }
}
