//! MJPEG frame extraction from a byte stream.
//!
//! Two file formats are auto-detected per frame:
//!
//! 1. **Length-prefixed**: 5 ASCII-decimal bytes giving the length `N` of
//!    the frame that follows, then `N` raw bytes.
//! 2. **Raw MJPEG**: if the 5-byte prefix doesn't parse as decimal, it's
//!    treated as the start of a JPEG frame and the stream is scanned
//!    forward for the first EOI marker (`0xFF 0xD9`). Bytes read past
//!    EOI are seeked back so the next call starts exactly where this one
//!    left off.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{Result, StreamError};

/// JPEG end-of-image marker.
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Chunk size used when scanning forward for EOI in raw MJPEG mode.
const SCAN_CHUNK: usize = 10 * 1024;

/// Number of bytes read to probe whether a frame is length-prefixed.
const LENGTH_PREFIX_SIZE: usize = 5;

/// Demuxer that lazily yields the next MJPEG frame from a byte source.
///
/// Generic over `R: Read + Seek` so tests can exercise both file formats
/// against an in-memory `Cursor<Vec<u8>>` without touching the
/// filesystem; [`VideoStream::open`] is the filesystem-backed
/// constructor used in production.
pub struct VideoStream<R> {
    reader: R,
    frame_num: u64,
}

impl VideoStream<File> {
    /// Open a media file for frame extraction.
    ///
    /// Maps an I/O error to [`StreamError::MediaNotFound`] so
    /// `ServerWorker` can reply 404 without inspecting `io::Error` kinds.
    pub fn open(filename: &str) -> Result<Self> {
        let file = File::open(filename).map_err(|_| StreamError::MediaNotFound(filename.to_string()))?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read + Seek> VideoStream<R> {
    /// Wrap an existing reader (used by `open` and by tests).
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            frame_num: 0,
        }
    }

    /// Return the next complete frame, or `None` at end of stream.
    ///
    /// Invariant: concatenating every frame this method has ever
    /// returned equals the prefix of the underlying stream consumed so
    /// far — no bytes are dropped between frames, and raw-MJPEG
    /// over-reads are seeked back.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        let n = match self.reader.read(&mut prefix) {
            Ok(0) => return None,
            Ok(n) => n,
            Err(_) => return None,
        };
        let prefix = &prefix[..n];

        if let Some(len) = parse_decimal_length(prefix) {
            let mut buf = vec![0u8; len];
            if self.reader.read_exact(&mut buf).is_err() {
                return None;
            }
            self.frame_num += 1;
            return Some(buf);
        }

        self.scan_for_eoi(prefix.to_vec())
    }

    /// Raw-MJPEG path: `frame` already holds the initial prefix bytes;
    /// keep appending chunks until EOI is found or the stream ends.
    fn scan_for_eoi(&mut self, mut frame: Vec<u8>) -> Option<Vec<u8>> {
        let mut chunk = [0u8; SCAN_CHUNK];
        loop {
            if let Some(pos) = find_eoi(&frame) {
                let frame_end = pos + EOI.len();
                let extra = frame.len() - frame_end;
                if extra > 0 {
                    // Put back bytes that belong to the next frame.
                    let _ = self.reader.seek(SeekFrom::Current(-(extra as i64)));
                }
                frame.truncate(frame_end);
                self.frame_num += 1;
                return Some(frame);
            }

            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    // EOF without EOI: whatever we have is the last (possibly
                    // truncated) frame. Still counts as a frame if non-empty.
                    if frame.is_empty() {
                        return None;
                    }
                    self.frame_num += 1;
                    return Some(frame);
                }
                Ok(n) => frame.extend_from_slice(&chunk[..n]),
                Err(_) => return None,
            }
        }
    }

    /// Number of frames returned so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_num
    }

    /// Rewind to the start of the stream and reset the frame counter.
    pub fn reset(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.frame_num = 0;
        Ok(())
    }
}

/// Try to parse `prefix` as an ASCII-decimal frame length. Fails (and
/// falls back to raw-MJPEG scanning) on non-UTF8, non-numeric, or empty
/// input — exactly the cases the Python reference's `int(data)` raises
/// `ValueError` on.
fn parse_decimal_length(prefix: &[u8]) -> Option<usize> {
    std::str::from_utf8(prefix)
        .ok()?
        .trim()
        .parse::<usize>()
        .ok()
}

fn find_eoi(data: &[u8]) -> Option<usize> {
    data.windows(EOI.len()).position(|w| w == EOI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(bytes: Vec<u8>) -> VideoStream<Cursor<Vec<u8>>> {
        VideoStream::from_reader(Cursor::new(bytes))
    }

    #[test]
    fn length_prefixed_round_trip() {
        let frames: &[&[u8]] = &[b"hello", b"world!", b"x"];
        let mut data = Vec::new();
        for f in frames {
            data.extend_from_slice(format!("{:05}", f.len()).as_bytes());
            data.extend_from_slice(f);
        }

        let mut vs = stream(data);
        for f in frames {
            assert_eq!(vs.next_frame().as_deref(), Some(*f));
        }
        assert_eq!(vs.next_frame(), None);
        assert_eq!(vs.frame_number(), frames.len() as u64);
    }

    #[test]
    fn raw_mjpeg_round_trip() {
        let frame_a = [0xFFu8, 0xD8, 0x01, 0x02, 0xFF, 0xD9];
        let frame_b = [0xFFu8, 0xD8, 0x03, 0xFF, 0xD9];
        let mut data = Vec::new();
        data.extend_from_slice(&frame_a);
        data.extend_from_slice(&frame_b);

        let mut vs = stream(data);
        assert_eq!(vs.next_frame().as_deref(), Some(frame_a.as_slice()));
        assert_eq!(vs.next_frame().as_deref(), Some(frame_b.as_slice()));
        assert_eq!(vs.next_frame(), None);
    }

    #[test]
    fn raw_mjpeg_spanning_multiple_chunks() {
        // Frame bigger than the 10KB scan chunk to exercise the loop.
        let mut frame = vec![0xFF, 0xD8];
        frame.extend(std::iter::repeat(0xAA).take(SCAN_CHUNK * 2));
        frame.extend_from_slice(&EOI);

        let mut vs = stream(frame.clone());
        assert_eq!(vs.next_frame(), Some(frame));
        assert_eq!(vs.next_frame(), None);
    }

    #[test]
    fn truncated_frame_at_eof_without_eoi() {
        let data = vec![0xFF, 0xD8, 0x01, 0x02];
        let mut vs = stream(data.clone());
        assert_eq!(vs.next_frame(), Some(data));
        assert_eq!(vs.next_frame(), None);
    }

    #[test]
    fn reset_rewinds_and_zeros_counter() {
        let frames: &[&[u8]] = &[b"abc", b"de"];
        let mut data = Vec::new();
        for f in frames {
            data.extend_from_slice(format!("{:05}", f.len()).as_bytes());
            data.extend_from_slice(f);
        }

        let mut vs = stream(data);
        vs.next_frame();
        vs.next_frame();
        assert_eq!(vs.frame_number(), 2);

        vs.reset().unwrap();
        assert_eq!(vs.frame_number(), 0);
        assert_eq!(vs.next_frame().as_deref(), Some(*frames.first().unwrap()));
    }

    #[test]
    fn empty_stream_is_immediate_eos() {
        let mut vs = stream(Vec::new());
        assert_eq!(vs.next_frame(), None);
    }
}
