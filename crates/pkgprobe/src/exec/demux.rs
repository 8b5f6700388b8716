//! Demultiplexing of the framed stdout/stderr stream.
//!
//! The transport carries both channels over one byte stream. Every chunk starts with an
//! 8-byte header: byte 0 is the channel tag (1 = stdout, 2 = stderr), bytes 4..8 are the
//! big-endian payload length. Everything after the header is payload.
//!
//! [`Demuxer`] works chunk by chunk: a chunk shorter than the header carries no payload
//! and is dropped, and the payload is taken as bytes `8..` of the chunk. [`split_frames`]
//! turns an arbitrary byte stream into such chunks using the length field, so socket
//! read boundaries never reach the demuxer.

use tracing::trace;

/// Size of the per-chunk frame header.
pub const FRAME_HEADER_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Stdout,
    Stderr,
}

impl Channel {
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Stdout),
            2 => Some(Self::Stderr),
            _ => None,
        }
    }

    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Stdout => 1,
            Self::Stderr => 2,
        }
    }
}

/// Accumulates framed chunks into per-channel buffers.
#[derive(Clone, Debug, Default)]
pub struct Demuxer {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Demuxer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk's payload to the channel named by its header.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        let (Some(&tag), Some(payload)) = (chunk.first(), chunk.get(FRAME_HEADER_LEN..)) else {
            trace!(len = chunk.len(), "dropping chunk shorter than frame header");
            return;
        };
        match Channel::from_tag(tag) {
            Some(Channel::Stdout) => self.stdout.extend_from_slice(payload),
            Some(Channel::Stderr) => self.stderr.extend_from_slice(payload),
            None => trace!(tag, "ignoring chunk with unknown channel tag"),
        }
    }

    /// Raw accumulated payload bytes for a channel.
    #[must_use]
    pub fn raw(&self, channel: Channel) -> &[u8] {
        match channel {
            Channel::Stdout => &self.stdout,
            Channel::Stderr => &self.stderr,
        }
    }

    /// Decoded `(stdout, stderr)`, each trimmed of surrounding whitespace.
    #[must_use]
    pub fn finish(self) -> (String, String) {
        (decode_trimmed(&self.stdout), decode_trimmed(&self.stderr))
    }
}

fn decode_trimmed(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// Demultiplex a sequence of chunks into trimmed `(stdout, stderr)`.
pub fn demux<'a, I>(chunks: I) -> (String, String)
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut demuxer = Demuxer::new();
    for chunk in chunks {
        demuxer.push_chunk(chunk);
    }
    demuxer.finish()
}

/// Build one framed chunk. Used by transports that produce frames themselves and by tests.
#[must_use]
pub fn encode_frame(channel: Channel, payload: &[u8]) -> Vec<u8> {
    let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.push(channel.tag());
    frame.extend_from_slice(&[0, 0, 0]);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Split a raw multiplexed stream into frame-sized chunks.
///
/// A trailing partial frame is yielded as one final chunk.
#[must_use]
pub fn split_frames(stream: &[u8]) -> Frames<'_> {
    Frames { rest: stream }
}

/// Iterator returned by [`split_frames`].
#[derive(Clone, Debug)]
pub struct Frames<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let frame_len = self
            .rest
            .get(4..FRAME_HEADER_LEN)
            .and_then(|len| <[u8; 4]>::try_from(len).ok())
            .and_then(|len| usize::try_from(u32::from_be_bytes(len)).ok())
            .map_or(self.rest.len(), |len| FRAME_HEADER_LEN.saturating_add(len))
            .min(self.rest.len());
        let (frame, rest) = self.rest.split_at(frame_len);
        self.rest = rest;
        Some(frame)
    }
}
