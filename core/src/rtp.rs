//! RTP packet encode/decode (12-byte fixed header, no extensions).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                             SSRC                              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Unlike the RFC 3550 convention of a 90kHz media clock, the timestamp
//! here is wall-clock seconds at encode time (adequate for logging, not
//! RFC-3550 compliant — preserved intentionally, see spec §9).

use std::time::{SystemTime, UNIX_EPOCH};

/// Size of the fixed RTP header in bytes.
pub const HEADER_SIZE: usize = 12;

/// Maximum RTP payload size before a frame must be fragmented.
pub const MAX_PAYLOAD: usize = 1400;

/// RTP payload type used for MJPEG video.
pub const MJPEG_PAYLOAD_TYPE: u8 = 26;

/// Sentinel payload signaling end-of-stream; always sent as a single
/// packet with the marker bit set.
pub const EOS_PAYLOAD: &[u8] = b"EOS";

/// A decoded or encoded RTP packet: 12-byte header plus payload.
///
/// No error is raised for malformed input on [`decode`](Self::decode) —
/// the accessors just return whatever the header bits say. Callers
/// validate out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    header: [u8; HEADER_SIZE],
    payload: Vec<u8>,
}

impl RtpPacket {
    /// Build a packet from header fields and a payload, per the RTP
    /// fixed-header layout above. `version`/`padding`/`extension`/`cc`
    /// are packed as their low bits (2/1/1/4) regardless of width.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        version: u8,
        padding: u8,
        extension: u8,
        cc: u8,
        seqnum: u16,
        marker: bool,
        payload_type: u8,
        ssrc: u32,
        payload: Vec<u8>,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        let mut header = [0u8; HEADER_SIZE];
        header[0] = ((version & 0x03) << 6) | ((padding & 0x01) << 5) | ((extension & 0x01) << 4)
            | (cc & 0x0F);
        header[1] = ((marker as u8) << 7) | (payload_type & 0x7F);
        header[2..4].copy_from_slice(&seqnum.to_be_bytes());
        header[4..8].copy_from_slice(&timestamp.to_be_bytes());
        header[8..12].copy_from_slice(&ssrc.to_be_bytes());

        Self { header, payload }
    }

    /// Split `bytes` into a 12-byte header and trailing payload.
    ///
    /// Tolerant of short input: if `bytes` is shorter than
    /// [`HEADER_SIZE`], the missing header bytes are treated as zero and
    /// the payload is empty. This mirrors the reference decoder, which
    /// never validates its input.
    pub fn decode(bytes: &[u8]) -> Self {
        let mut header = [0u8; HEADER_SIZE];
        let header_len = bytes.len().min(HEADER_SIZE);
        header[..header_len].copy_from_slice(&bytes[..header_len]);

        let payload = if bytes.len() > HEADER_SIZE {
            bytes[HEADER_SIZE..].to_vec()
        } else {
            Vec::new()
        };

        Self { header, payload }
    }

    /// RTP version (2-bit field, top of byte 0).
    pub fn version(&self) -> u8 {
        self.header[0] >> 6
    }

    /// 16-bit sequence number.
    pub fn seq_num(&self) -> u16 {
        u16::from_be_bytes([self.header[2], self.header[3]])
    }

    /// 32-bit wall-clock-seconds timestamp.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([
            self.header[4],
            self.header[5],
            self.header[6],
            self.header[7],
        ])
    }

    /// 32-bit synchronization source identifier.
    pub fn ssrc(&self) -> u32 {
        u32::from_be_bytes([
            self.header[8],
            self.header[9],
            self.header[10],
            self.header[11],
        ])
    }

    /// 7-bit payload type field.
    pub fn payload_type(&self) -> u8 {
        self.header[1] & 0x7F
    }

    /// Marker bit: high bit of byte 1.
    pub fn marker(&self) -> bool {
        self.header[1] & 0x80 != 0
    }

    /// Borrow the payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serialize header + payload into a single wire-ready buffer.
    pub fn packet(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Whether this packet is the end-of-stream sentinel: payload `b"EOS"`
    /// with the marker bit set.
    pub fn is_eos(&self) -> bool {
        self.marker() && self.payload == EOS_PAYLOAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_fields() {
        let payload = vec![1, 2, 3, 4, 5];
        let encoded = RtpPacket::encode(2, 0, 0, 0, 4242, true, MJPEG_PAYLOAD_TYPE, 0xDEADBEEF, payload.clone());
        let bytes = encoded.packet();
        let decoded = RtpPacket::decode(&bytes);

        assert_eq!(decoded.version(), 2);
        assert_eq!(decoded.seq_num(), 4242);
        assert_eq!(decoded.payload_type(), MJPEG_PAYLOAD_TYPE);
        assert!(decoded.marker());
        assert_eq!(decoded.ssrc(), 0xDEADBEEF);
        assert_eq!(decoded.payload(), payload.as_slice());
    }

    #[test]
    fn marker_bit_clear() {
        let encoded = RtpPacket::encode(2, 0, 0, 0, 1, false, MJPEG_PAYLOAD_TYPE, 0, vec![]);
        assert!(!encoded.marker());
    }

    #[test]
    fn payload_type_masks_to_seven_bits() {
        let encoded = RtpPacket::encode(2, 0, 0, 0, 1, true, 0xFF, 0, vec![]);
        // 0xFF truncated to 7 bits is 0x7F.
        assert_eq!(encoded.payload_type(), 0x7F);
    }

    #[test]
    fn decode_short_input_is_lenient() {
        let decoded = RtpPacket::decode(&[0x80, 0x9A]);
        assert_eq!(decoded.version(), 2);
        assert!(decoded.payload().is_empty());
    }

    #[test]
    fn eos_sentinel_detected() {
        let eos = RtpPacket::encode(2, 0, 0, 0, 7, true, MJPEG_PAYLOAD_TYPE, 0, EOS_PAYLOAD.to_vec());
        assert!(eos.is_eos());

        let not_eos_no_marker =
            RtpPacket::encode(2, 0, 0, 0, 7, false, MJPEG_PAYLOAD_TYPE, 0, EOS_PAYLOAD.to_vec());
        assert!(!not_eos_no_marker.is_eos());

        let not_eos_wrong_payload =
            RtpPacket::encode(2, 0, 0, 0, 7, true, MJPEG_PAYLOAD_TYPE, 0, b"frame".to_vec());
        assert!(!not_eos_wrong_payload.is_eos());
    }

    #[test]
    fn timestamp_is_monotonic_non_decreasing() {
        let a = RtpPacket::encode(2, 0, 0, 0, 1, false, MJPEG_PAYLOAD_TYPE, 0, vec![]);
        let b = RtpPacket::encode(2, 0, 0, 0, 2, false, MJPEG_PAYLOAD_TYPE, 0, vec![]);
        assert!(b.timestamp() >= a.timestamp());
    }
}
