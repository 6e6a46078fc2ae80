//! SSH agent framing.
//!
//! Every message travels as `uint32 length || byte type || payload`, where
//! `length` counts the type byte and the payload.

use std::io::{Read, Write};
use std::mem::size_of;

use byteorder::{BigEndian, ByteOrder};
use log::trace;
use ssh_encoding::{CheckedSum, Encode, Writer};

use crate::{
    error::AgentError,
    proto::{ProtoError, ProtoResult, Response},
    transport::Transport,
};

/// Largest frame accepted by default.
///
/// Matches OpenSSH's `AGENT_MAX_LEN`.
pub const MAX_FRAME_LEN: usize = 256 * 1024;

/// One message with the type byte split from its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message number.
    pub message_id: u8,

    /// Everything after the message number.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Frame carrying `payload` under `message_id`.
    pub fn new(message_id: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            message_id,
            payload: payload.into(),
        }
    }

    /// Interpret this frame as a message from the agent.
    ///
    /// The message must use up the whole payload.
    pub fn to_response(&self) -> ProtoResult<Response> {
        let mut reader = &self.payload[..];
        let response = Response::decode_payload(self.message_id, &mut reader)?;
        ensure_consumed(reader)?;
        Ok(response)
    }
}

impl Encode for Frame {
    fn encoded_len(&self) -> ssh_encoding::Result<usize> {
        [1, self.payload.len()].checked_sum()
    }

    fn encode(&self, writer: &mut impl Writer) -> ssh_encoding::Result<()> {
        self.message_id.encode(writer)?;
        writer.write(&self.payload)
    }
}

/// Check a declared frame length against `max_frame_len`.
pub(crate) fn check_len(length: usize, max_frame_len: usize) -> ProtoResult<()> {
    if length == 0 {
        Err(ProtoError::FrameTooShort)
    } else if length > max_frame_len {
        Err(ProtoError::FrameTooLarge {
            length,
            max: max_frame_len,
        })
    } else {
        Ok(())
    }
}

/// Fail with [`ProtoError::TrailingData`] unless `rest` is empty.
pub(crate) fn ensure_consumed(rest: &[u8]) -> ProtoResult<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(ProtoError::TrailingData {
            remaining: rest.len(),
        })
    }
}

/// Length-prefix an encoded message.
///
/// `message` must encode its own type byte, as [`Request`](crate::proto::Request),
/// [`Response`] and [`Frame`] do.
pub fn encode_frame(message: &impl Encode, max_frame_len: usize) -> ProtoResult<Vec<u8>> {
    let length = message.encoded_len()?;
    check_len(length, max_frame_len)?;

    let mut bytes = Vec::with_capacity(size_of::<u32>() + length);
    (length as u32).encode(&mut bytes)?;
    message.encode(&mut bytes)?;
    Ok(bytes)
}

/// Encode `message` and write it to `transport` in one piece.
pub fn write_frame<S: Read + Write>(
    transport: &mut Transport<S>,
    message: &impl Encode,
    max_frame_len: usize,
) -> Result<(), AgentError> {
    let bytes = encode_frame(message, max_frame_len)?;
    trace!("Writing frame of {} bytes", bytes.len() - size_of::<u32>());
    transport.write_all(&bytes)
}

/// Read one frame from `transport`.
///
/// The declared length is checked before anything is allocated for the body.
pub fn read_frame<S: Read + Write>(
    transport: &mut Transport<S>,
    max_frame_len: usize,
) -> Result<Frame, AgentError> {
    let mut len = [0; size_of::<u32>()];
    transport.read_exact(&mut len)?;
    let length = BigEndian::read_u32(&len) as usize;
    check_len(length, max_frame_len)?;
    trace!("Reading frame of {length} bytes");

    let mut body = vec![0; length];
    transport.read_exact(&mut body)?;
    let payload = body.split_off(1);

    Ok(Frame {
        message_id: body[0],
        payload,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use hex_literal::hex;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;
    use crate::proto::{Failure, Request};

    /// Stream handing out at most `chunk` bytes per read.
    #[derive(Debug)]
    struct Trickle {
        input: VecDeque<u8>,
        chunk: usize,
        reads: usize,
    }

    impl Trickle {
        fn new(input: impl Into<VecDeque<u8>>, chunk: usize) -> Self {
            Self {
                input: input.into(),
                chunk,
                reads: 0,
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            let n = buf.len().min(self.chunk).min(self.input.len());
            for (slot, byte) in buf.iter_mut().zip(self.input.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(255)]
    #[case(65_536)]
    #[case(MAX_FRAME_LEN - 1)]
    fn frames_survive_the_wire(#[case] payload_len: usize) -> TestResult {
        let frame = Frame::new(29, vec![0xa5; payload_len]);
        let bytes = encode_frame(&frame, MAX_FRAME_LEN)?;
        assert_eq!(bytes.len(), 4 + 1 + payload_len);

        let mut transport = Transport::new(Trickle::new(bytes, usize::MAX));
        assert_eq!(read_frame(&mut transport, MAX_FRAME_LEN)?, frame);
        Ok(())
    }

    #[test]
    fn partial_reads_are_accumulated() -> TestResult {
        let bytes = hex!("00000009 05 00000004 6e6f7065");
        let mut transport = Transport::new(Trickle::new(bytes.to_vec(), 1));
        let frame = read_frame(&mut transport, MAX_FRAME_LEN)?;
        assert_eq!(
            frame.to_response()?,
            Response::Failure(Failure::with_reason("nope"))
        );
        Ok(())
    }

    #[test]
    fn oversized_length_is_rejected_before_reading_body() {
        let mut bytes = (MAX_FRAME_LEN as u32 + 1).to_be_bytes().to_vec();
        bytes.extend_from_slice(&[5; 16]);
        let mut transport = Transport::new(Trickle::new(bytes, usize::MAX));
        assert!(matches!(
            read_frame(&mut transport, MAX_FRAME_LEN),
            Err(AgentError::Proto(ProtoError::FrameTooLarge { length, max }))
                if length == MAX_FRAME_LEN + 1 && max == MAX_FRAME_LEN
        ));
        let Some(trickle) = transport.into_inner() else {
            panic!("stream should still be open");
        };
        assert_eq!(trickle.input.len(), 16, "body must not be consumed");
        assert_eq!(trickle.reads, 1);
    }

    #[test]
    fn leftover_payload_is_malformed() -> TestResult {
        let bytes = hex!("0000000d 0c 00000000 0102030405060708");
        let mut transport = Transport::new(Trickle::new(bytes.to_vec(), usize::MAX));
        let frame = read_frame(&mut transport, MAX_FRAME_LEN)?;
        assert!(matches!(
            frame.to_response(),
            Err(ProtoError::TrailingData { remaining: 8 })
        ));
        Ok(())
    }

    #[test]
    fn zero_length_is_rejected() {
        let mut transport = Transport::new(Trickle::new(vec![0, 0, 0, 0], usize::MAX));
        assert!(matches!(
            read_frame(&mut transport, MAX_FRAME_LEN),
            Err(AgentError::Proto(ProtoError::FrameTooShort))
        ));
    }

    #[test]
    fn eof_inside_frame_is_connection_closed() {
        let mut transport = Transport::new(Trickle::new(hex!("00000005 0c00").to_vec(), 3));
        assert!(matches!(
            read_frame(&mut transport, MAX_FRAME_LEN),
            Err(AgentError::ConnectionClosed)
        ));
    }

    #[test]
    fn requests_are_length_prefixed() -> TestResult {
        assert_eq!(
            encode_frame(&Request::RequestIdentities, MAX_FRAME_LEN)?,
            hex!("00000001 0b")
        );
        assert!(matches!(
            encode_frame(&Frame::new(13, vec![0; 32]), 16),
            Err(ProtoError::FrameTooLarge { length: 33, max: 16 })
        ));
        Ok(())
    }
}
