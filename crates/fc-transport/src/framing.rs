use crate::error::TransportError;

/// The literal byte sequence delimiting frames on the wire. Kept
/// byte-for-byte from the reference wire format — this is the protocol's
/// magic string, not a naming choice, and changing it breaks interop.
pub const SEPARATOR: &[u8] = b"\0\0\0AXIOM-P2P-STOP\0\0\0";

/// Appends the frame separator to `payload`, rejecting any payload that
/// already contains it (which would desynchronize the reader on the other
/// end).
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    if contains_separator(payload) {
        return Err(TransportError::SeparatorInPayload);
    }
    let mut framed = Vec::with_capacity(payload.len() + SEPARATOR.len());
    framed.extend_from_slice(payload);
    framed.extend_from_slice(SEPARATOR);
    Ok(framed)
}

fn contains_separator(data: &[u8]) -> bool {
    data.windows(SEPARATOR.len()).any(|w| w == SEPARATOR)
}

/// Accumulates bytes read off a socket and yields complete frames as they
/// arrive, buffering a partial frame across multiple reads.
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Appends freshly-read bytes to the internal buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pulls the next complete frame out of the buffer, if one has fully
    /// arrived. Call repeatedly after each [`push`](Self::push) — a single
    /// read can contain more than one frame.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let pos = find_separator(&self.buffer)?;
        let frame = self.buffer[..pos].to_vec();
        self.buffer.drain(..pos + SEPARATOR.len());
        Some(frame)
    }
}

fn find_separator(data: &[u8]) -> Option<usize> {
    if data.len() < SEPARATOR.len() {
        return None;
    }
    data.windows(SEPARATOR.len()).position(|w| w == SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_round_trips_across_two_pushes() {
        let mut reader = FrameReader::new();
        let framed = encode_frame(b"hello").unwrap();

        reader.push(&framed[..3]);
        assert!(reader.next_frame().is_none());

        reader.push(&framed[3..]);
        assert_eq!(reader.next_frame().unwrap(), b"hello");
    }

    #[test]
    fn two_frames_in_one_push_both_yielded() {
        let mut reader = FrameReader::new();
        let mut combined = encode_frame(b"first").unwrap();
        combined.extend(encode_frame(b"second").unwrap());

        reader.push(&combined);
        assert_eq!(reader.next_frame().unwrap(), b"first");
        assert_eq!(reader.next_frame().unwrap(), b"second");
        assert!(reader.next_frame().is_none());
    }

    #[test]
    fn payload_containing_separator_is_rejected() {
        let mut payload = b"before".to_vec();
        payload.extend_from_slice(SEPARATOR);
        payload.extend_from_slice(b"after");
        assert!(encode_frame(&payload).is_err());
    }
}
