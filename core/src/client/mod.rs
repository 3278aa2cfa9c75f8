//! RTSP requester + RTP receiver, driven by a caller (typically a CLI
//! binary) that owns the event loop.
//!
//! Grounded on `original_source/Client.py`: `sendRtspRequest` /
//! `recvRtspReply` / `parseRtspReply` become [`ClientSession`]'s
//! request/reply methods, and `listenRtp` becomes [`run_rtp_receiver`],
//! translated from the original's thread-plus-exception-driven shutdown
//! into this crate's `mpsc`-stop-channel idiom (spec §9's design note).
//! There is no teacher analogue for a requester of this shape — the
//! teacher crate is server-only — so the thread/lock idiom is carried
//! over from `core::server` instead.

use std::io::{Read, Write};
use std::net::{TcpStream, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::playback::PlaybackBuffer;
use crate::rtp::RtpPacket;
use crate::rtsp::{RtspRequest, RtspResponse};
use crate::session::SessionState;

/// Upper bound on a single RTSP reply read (spec §4.3: one reply per
/// `read()`).
const REPLY_BUF_SIZE: usize = 1024;
/// RTP datagrams are read in chunks this large (spec §4.5).
const RTP_RECV_BUF_SIZE: usize = 20 * 1024;
/// Socket receive buffer floor requested on the RTP UDP socket.
const RTP_SOCKET_BUFFER_SIZE: usize = 5 * 1024 * 1024;
/// How long `recv_from` blocks before re-checking the stop channel, so
/// PAUSE/TEARDOWN remain responsive even with no traffic arriving.
const RTP_RECV_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Frames larger than this are treated as corrupt and discarded.
const MAX_FRAME_BYTES: usize = 5_000_000;
/// Emit a throughput/loss log line every Nth packet.
const STATS_LOG_INTERVAL: u64 = 100;

/// Running statistics maintained by the RTP receive loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReceiverStats {
    pub total_bytes: u64,
    pub total_packets: u64,
    pub lost_packets: u64,
}

impl ReceiverStats {
    pub fn loss_rate_percent(&self) -> f64 {
        let denom = self.total_packets + self.lost_packets;
        if denom == 0 {
            0.0
        } else {
            (self.lost_packets as f64 / denom as f64) * 100.0
        }
    }
}

/// An RTSP/RTP client session: one control connection plus, while
/// PLAYING, one RTP receiver thread and its playback buffer.
pub struct ClientSession {
    stream: TcpStream,
    rtp_port: u16,
    filename: String,
    state: SessionState,
    rtsp_cseq: u32,
    session_id: u32,
    playback: Arc<PlaybackBuffer>,
    stats: Arc<parking_lot::Mutex<ReceiverStats>>,
    rtp_stop_tx: Option<mpsc::Sender<()>>,
    rtp_thread: Option<JoinHandle<()>>,
}

impl ClientSession {
    /// Open the RTSP control connection. Does not send any request yet.
    pub fn connect(server_host: &str, server_port: u16, rtp_port: u16, filename: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect((server_host, server_port))?;
        Ok(Self {
            stream,
            rtp_port,
            filename: filename.to_string(),
            state: SessionState::Init,
            rtsp_cseq: 0,
            session_id: 0,
            playback: Arc::new(PlaybackBuffer::new()),
            stats: Arc::new(parking_lot::Mutex::new(ReceiverStats::default())),
            rtp_stop_tx: None,
            rtp_thread: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn playback_buffer(&self) -> Arc<PlaybackBuffer> {
        self.playback.clone()
    }

    pub fn stats(&self) -> ReceiverStats {
        *self.stats.lock()
    }

    /// Send SETUP. No-op if not in `Init`.
    pub fn setup(&mut self) -> std::io::Result<()> {
        if self.state != SessionState::Init {
            return Ok(());
        }
        let request = RtspRequest {
            method: "SETUP".to_string(),
            filename: self.filename.clone(),
            cseq: self.next_cseq(),
            client_rtp_port: Some(self.rtp_port),
            session_id: None,
        };
        if let Some(resp) = self.send_and_await(&request)? {
            if resp.status_code == 200 {
                self.state = SessionState::Ready;
                tracing::info!(session_id = self.session_id, "SETUP -> READY");
            }
        }
        Ok(())
    }

    /// Send PLAY and, on success, start the RTP receiver. No-op if not
    /// in `Ready`.
    pub fn play(&mut self) -> std::io::Result<()> {
        if self.state != SessionState::Ready {
            return Ok(());
        }
        let request = RtspRequest {
            method: "PLAY".to_string(),
            filename: self.filename.clone(),
            cseq: self.next_cseq(),
            client_rtp_port: None,
            session_id: Some(self.session_id),
        };
        if let Some(resp) = self.send_and_await(&request)? {
            if resp.status_code == 200 {
                // Loss/throughput accounting is transient and resets on
                // every PLAY (spec §3), not just on the first one.
                *self.stats.lock() = ReceiverStats::default();
                self.start_rtp_receiver()?;
                self.state = SessionState::Playing;
                tracing::info!(session_id = self.session_id, "PLAY -> PLAYING");
            }
        }
        Ok(())
    }

    /// Send PAUSE and stop the RTP receiver. No-op if not `Playing`.
    pub fn pause(&mut self) -> std::io::Result<()> {
        if self.state != SessionState::Playing {
            return Ok(());
        }
        let request = RtspRequest {
            method: "PAUSE".to_string(),
            filename: self.filename.clone(),
            cseq: self.next_cseq(),
            client_rtp_port: None,
            session_id: Some(self.session_id),
        };
        if let Some(resp) = self.send_and_await(&request)? {
            if resp.status_code == 200 {
                self.stop_rtp_receiver();
                self.state = SessionState::Ready;
                tracing::info!(session_id = self.session_id, "PAUSE -> READY");
            }
        }
        Ok(())
    }

    /// Send TEARDOWN, stop any receiver, and close the control
    /// connection. No-op if already `Init`.
    pub fn teardown(&mut self) -> std::io::Result<()> {
        if self.state == SessionState::Init {
            return Ok(());
        }
        let request = RtspRequest {
            method: "TEARDOWN".to_string(),
            filename: self.filename.clone(),
            cseq: self.next_cseq(),
            client_rtp_port: None,
            session_id: Some(self.session_id),
        };
        if let Some(resp) = self.send_and_await(&request)? {
            if resp.status_code == 200 {
                self.stop_rtp_receiver();
                self.state = SessionState::Init;
                tracing::info!(session_id = self.session_id, "TEARDOWN -> INIT");
            }
        }
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        Ok(())
    }

    fn next_cseq(&mut self) -> u32 {
        self.rtsp_cseq += 1;
        self.rtsp_cseq
    }

    /// Write `request`, read one reply, and return it only if its CSeq
    /// matches and (once a session id is known) its session matches too
    /// — mirrors `parseRtspReply`'s guard before any state transition.
    fn send_and_await(&mut self, request: &RtspRequest) -> std::io::Result<Option<RtspResponse>> {
        self.stream.write_all(request.serialize().as_bytes())?;
        tracing::debug!(method = %request.method, cseq = request.cseq, "request sent");

        let mut buf = [0u8; REPLY_BUF_SIZE];
        let n = self.stream.read(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&buf[..n]);
        let response = match RtspResponse::parse(&text) {
            Some(r) => r,
            None => return Ok(None),
        };

        if response.cseq != request.cseq {
            tracing::warn!(
                expected = request.cseq,
                got = response.cseq,
                "CSeq mismatch, ignoring reply"
            );
            return Ok(None);
        }

        if let Some(session) = response.session_id {
            if self.session_id == 0 {
                self.session_id = session;
            } else if self.session_id != session {
                tracing::warn!(
                    expected = self.session_id,
                    got = session,
                    "session id mismatch, ignoring reply"
                );
                return Ok(None);
            }
        }

        Ok(Some(response))
    }

    fn start_rtp_receiver(&mut self) -> std::io::Result<()> {
        let socket = UdpSocket::bind(("0.0.0.0", self.rtp_port))?;
        socket.set_read_timeout(Some(RTP_RECV_POLL_INTERVAL))?;

        let (stop_tx, stop_rx) = mpsc::channel();
        let playback = self.playback.clone();
        let stats = self.stats.clone();

        let handle = thread::spawn(move || {
            run_rtp_receiver(socket, stop_rx, playback, stats);
        });

        self.rtp_stop_tx = Some(stop_tx);
        self.rtp_thread = Some(handle);
        Ok(())
    }

    fn stop_rtp_receiver(&mut self) {
        if let Some(tx) = self.rtp_stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.rtp_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.stop_rtp_receiver();
    }
}

/// Per-receiver reassembly state, kept out of [`ClientSession`] so the
/// loop body can own it without borrowing back into the session.
struct ReassemblyState {
    current_frame: Vec<u8>,
    last_seq: i64,
    expected_seq: u32,
    discarding: bool,
    start_time: Instant,
}

impl ReassemblyState {
    fn new() -> Self {
        Self {
            current_frame: Vec::new(),
            last_seq: -1,
            expected_seq: 0,
            discarding: false,
            start_time: Instant::now(),
        }
    }
}

/// RTP receive loop: statistics, gap detection, reassembly, and
/// hand-off to the playback buffer. Runs on its own thread between PLAY
/// and PAUSE/TEARDOWN.
fn run_rtp_receiver(
    socket: UdpSocket,
    stop_rx: mpsc::Receiver<()>,
    playback: Arc<PlaybackBuffer>,
    stats: Arc<parking_lot::Mutex<ReceiverStats>>,
) {
    let _ = socket.set_recv_buffer_size(RTP_SOCKET_BUFFER_SIZE);
    let mut state = ReassemblyState::new();
    let mut buf = [0u8; RTP_RECV_BUF_SIZE];
    let packet_counter = AtomicU64::new(0);

    loop {
        if stop_rx.try_recv().is_ok() {
            return;
        }

        let n = match socket.recv(&mut buf) {
            Ok(n) => n,
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(_) => return,
        };
        if n == 0 {
            continue;
        }

        let packet = RtpPacket::decode(&buf[..n]);
        let seq = packet.seq_num() as u32;

        {
            let mut s = stats.lock();
            s.total_bytes += n as u64;
            if state.expected_seq > 0 && seq > state.expected_seq {
                let loss = (seq - state.expected_seq) as u64;
                s.lost_packets += loss;
                tracing::warn!(
                    expected = state.expected_seq,
                    got = seq,
                    lost = loss,
                    "packet loss event"
                );
            }
            s.total_packets += 1;
            let count = packet_counter.fetch_add(1, Ordering::Relaxed) + 1;
            if count % STATS_LOG_INTERVAL == 0 {
                let elapsed = state.start_time.elapsed().as_secs_f64();
                let rate_kbps = if elapsed > 0.0 {
                    (s.total_bytes as f64 * 8.0) / elapsed / 1000.0
                } else {
                    0.0
                };
                tracing::info!(
                    seq,
                    rate_kbps = format!("{:.2}", rate_kbps),
                    loss_pct = format!("{:.2}", s.loss_rate_percent()),
                    "receiver stats"
                );
            }
        }
        state.expected_seq = seq + 1;

        // Sequence-gap detection: anything we were assembling is
        // corrupt, discard it and skip packets until the next marker.
        if state.last_seq != -1 && seq as i64 != state.last_seq + 1 {
            if !state.current_frame.is_empty() {
                tracing::warn!(
                    expected = state.last_seq + 1,
                    got = seq,
                    "packet loss detected, discarding corrupted frame"
                );
                state.current_frame.clear();
            }
            state.discarding = true;
        }
        state.last_seq = seq as i64;

        if state.discarding {
            if packet.marker() {
                state.discarding = false;
            }
            continue;
        }

        if state.current_frame.len() + packet.payload().len() > MAX_FRAME_BYTES {
            tracing::warn!("frame buffer overflow, clearing");
            state.current_frame.clear();
            state.discarding = true;
            continue;
        }

        state.current_frame.extend_from_slice(packet.payload());

        if packet.marker() {
            let frame = std::mem::take(&mut state.current_frame);
            if packet.is_eos() {
                tracing::info!("end of stream sentinel received");
            } else {
                playback.push(frame);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_rate_is_zero_with_no_packets() {
        let stats = ReceiverStats::default();
        assert_eq!(stats.loss_rate_percent(), 0.0);
    }

    #[test]
    fn loss_rate_reflects_lost_over_total_plus_lost() {
        let stats = ReceiverStats {
            total_bytes: 0,
            total_packets: 90,
            lost_packets: 10,
        };
        assert_eq!(stats.loss_rate_percent(), 10.0);
    }
}
