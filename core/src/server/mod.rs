//! Per-connection RTSP handler and RTP sender loop.
//!
//! [`ServerWorker`] owns exactly one client connection's session for its
//! lifetime: the RTSP state machine, the `VideoStream` opened at SETUP,
//! and (while PLAYING) the UDP socket and sender thread. See
//! [`listener`] for the accept loop that creates one worker per
//! connection.

pub mod listener;

use std::fs::File;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::StreamError;
use crate::rtp::{RtpPacket, EOS_PAYLOAD, MAX_PAYLOAD, MJPEG_PAYLOAD_TYPE};
use crate::rtsp::{RtspRequest, RtspResponse};
use crate::session::{generate_session_id, SessionState};
use crate::video_stream::VideoStream;

/// How often the sender loop polls its stop channel between frames.
const SENDER_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Per-connection RTSP state machine + RTP sender.
pub struct ServerWorker {
    peer_ip: IpAddr,
    state: SessionState,
    session_id: Option<u32>,
    client_rtp_port: Option<u16>,
    video_stream: Option<Arc<Mutex<VideoStream<File>>>>,
    rtp_seq: Arc<AtomicU32>,
    udp_socket: Option<Arc<UdpSocket>>,
    stop_tx: Option<mpsc::Sender<()>>,
    sender_thread: Option<JoinHandle<()>>,
}

impl ServerWorker {
    /// Create a worker for a freshly accepted connection from `peer_ip`.
    pub fn new(peer_ip: IpAddr) -> Self {
        Self {
            peer_ip,
            state: SessionState::Init,
            session_id: None,
            client_rtp_port: None,
            video_stream: None,
            rtp_seq: Arc::new(AtomicU32::new(0)),
            udp_socket: None,
            stop_tx: None,
            sender_thread: None,
        }
    }

    /// Current session state, for tests and diagnostics.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Dispatch one parsed request to the matching handler. Returns
    /// `None` when the request doesn't match the current state (a
    /// mismatched transition is silently ignored per spec §4.3) or when
    /// the method isn't one of the four RTSP methods this core handles.
    pub fn handle_request(&mut self, request: &RtspRequest) -> Option<RtspResponse> {
        match request.method.as_str() {
            "SETUP" => self.handle_setup(request),
            "PLAY" => self.handle_play(request),
            "PAUSE" => self.handle_pause(request),
            "TEARDOWN" => self.handle_teardown(request),
            other => {
                tracing::warn!(method = other, "unsupported RTSP method");
                None
            }
        }
    }

    fn handle_setup(&mut self, request: &RtspRequest) -> Option<RtspResponse> {
        if self.state != SessionState::Init {
            return None;
        }

        match VideoStream::open(&request.filename) {
            Ok(stream) => {
                let session_id = generate_session_id();
                self.video_stream = Some(Arc::new(Mutex::new(stream)));
                self.session_id = Some(session_id);
                self.client_rtp_port = request.client_rtp_port;
                self.state = SessionState::Ready;
                tracing::info!(session_id, filename = %request.filename, "SETUP -> READY");
                Some(RtspResponse::ok(request.cseq, session_id))
            }
            Err(e) => {
                // Per spec §9's fix: no session id generated, state unchanged.
                tracing::warn!(filename = %request.filename, error = %e, "SETUP: file not found");
                Some(RtspResponse::not_found(request.cseq))
            }
        }
    }

    fn handle_play(&mut self, request: &RtspRequest) -> Option<RtspResponse> {
        if self.state != SessionState::Ready {
            return None;
        }
        let session_id = self.session_id?;
        let video_stream = self.video_stream.clone()?;
        let client_rtp_port = match self.client_rtp_port {
            Some(port) => port,
            None => {
                let err = StreamError::TransportNotConfigured(session_id);
                tracing::warn!(session_id, error = %err, "PLAY: no RTP client port negotiated");
                return None;
            }
        };

        let socket = match UdpSocket::bind("0.0.0.0:0") {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::error!(error = %e, "PLAY: failed to bind RTP socket");
                return None;
            }
        };

        let target = SocketAddr::new(self.peer_ip, client_rtp_port);
        let (stop_tx, stop_rx) = mpsc::channel();
        let rtp_seq = self.rtp_seq.clone();
        let sender_socket = socket.clone();

        let handle = thread::spawn(move || {
            run_sender_loop(stop_rx, video_stream, rtp_seq, sender_socket, target);
        });

        self.udp_socket = Some(socket);
        self.stop_tx = Some(stop_tx);
        self.sender_thread = Some(handle);
        self.state = SessionState::Playing;

        tracing::info!(session_id, %target, "PLAY -> PLAYING");
        Some(RtspResponse::ok(request.cseq, session_id))
    }

    fn handle_pause(&mut self, request: &RtspRequest) -> Option<RtspResponse> {
        if self.state != SessionState::Playing {
            return None;
        }
        let session_id = self.session_id?;
        self.stop_sender();
        self.state = SessionState::Ready;
        tracing::info!(session_id, "PAUSE -> READY");
        Some(RtspResponse::ok(request.cseq, session_id))
    }

    fn handle_teardown(&mut self, request: &RtspRequest) -> Option<RtspResponse> {
        if self.state == SessionState::Init {
            return None;
        }
        let session_id = self.session_id?;
        self.stop_sender();
        self.udp_socket.take();
        self.video_stream.take();
        self.state = SessionState::Init;
        tracing::info!(session_id, "TEARDOWN -> INIT");
        Some(RtspResponse::ok(request.cseq, session_id))
    }

    /// Signal the sender thread to stop and wait for it to exit. Safe to
    /// call when no sender is running.
    fn stop_sender(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.sender_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ServerWorker {
    /// If the connection drops mid-session (RTSP socket death, per spec
    /// §7), make sure the sender thread doesn't outlive it.
    fn drop(&mut self) {
        self.stop_sender();
    }
}

/// RTP sender loop body, run on its own thread between PLAY and
/// PAUSE/TEARDOWN.
///
/// Polls `stop_rx` with a 25ms timeout so PAUSE/TEARDOWN is observed
/// promptly (spec §4.4 step 1). Sequence numbers are never reset across
/// PAUSE/resume — `rtp_seq` is shared across the whole session's PLAY
/// spans via the worker, not reallocated per sender thread.
fn run_sender_loop(
    stop_rx: mpsc::Receiver<()>,
    video_stream: Arc<Mutex<VideoStream<File>>>,
    rtp_seq: Arc<AtomicU32>,
    socket: Arc<UdpSocket>,
    target: SocketAddr,
) {
    loop {
        match stop_rx.recv_timeout(SENDER_POLL_INTERVAL) {
            Ok(()) => return,
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        let frame = video_stream.lock().next_frame();
        let frame = match frame {
            Some(f) => f,
            None => {
                send_packet(&socket, target, &rtp_seq, EOS_PAYLOAD.to_vec(), true);
                tracing::info!(%target, "end of stream, sent EOS");
                return;
            }
        };

        if frame.len() > MAX_PAYLOAD {
            let chunks: Vec<&[u8]> = frame.chunks(MAX_PAYLOAD).collect();
            let last = chunks.len() - 1;
            for (i, chunk) in chunks.into_iter().enumerate() {
                send_packet(&socket, target, &rtp_seq, chunk.to_vec(), i == last);
            }
        } else {
            send_packet(&socket, target, &rtp_seq, frame, true);
        }
    }
}

fn send_packet(
    socket: &UdpSocket,
    target: SocketAddr,
    rtp_seq: &AtomicU32,
    payload: Vec<u8>,
    marker: bool,
) {
    let seq = rtp_seq.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
    let packet = RtpPacket::encode(2, 0, 0, 0, seq as u16, marker, MJPEG_PAYLOAD_TYPE, 0, payload);
    if let Err(e) = socket.send_to(&packet.packet(), target) {
        // Socket errors on RTP send are logged and ignored (spec §7);
        // streaming continues with the next frame.
        tracing::warn!(error = %e, %target, "RTP send failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::Ipv4Addr;

    fn write_length_prefixed(path: &std::path::Path, frames: &[&[u8]]) {
        let mut file = File::create(path).unwrap();
        for frame in frames {
            write!(file, "{:05}", frame.len()).unwrap();
            file.write_all(frame).unwrap();
        }
    }

    #[test]
    fn setup_file_not_found_replies_404_and_stays_init() {
        let mut worker = ServerWorker::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let req = RtspRequest {
            method: "SETUP".to_string(),
            filename: "/nonexistent/path/does-not-exist.mjpg".to_string(),
            cseq: 1,
            client_rtp_port: Some(25000),
            session_id: None,
        };
        let resp = worker.handle_request(&req).unwrap();
        assert_eq!(resp.status_code, 404);
        assert_eq!(resp.session_id, None);
        assert_eq!(worker.state(), SessionState::Init);
    }

    #[test]
    fn setup_happy_path_transitions_to_ready() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("rtsp_mjpeg_test_{}.mjpg", std::process::id()));
        write_length_prefixed(&path, &[b"frame-one"]);

        let mut worker = ServerWorker::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let req = RtspRequest {
            method: "SETUP".to_string(),
            filename: path.to_str().unwrap().to_string(),
            cseq: 1,
            client_rtp_port: Some(25000),
            session_id: None,
        };
        let resp = worker.handle_request(&req).unwrap();
        assert_eq!(resp.status_code, 200);
        assert!(resp.session_id.is_some());
        assert_eq!(worker.state(), SessionState::Ready);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn mismatched_transition_is_ignored() {
        let mut worker = ServerWorker::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let play_req = RtspRequest {
            method: "PLAY".to_string(),
            filename: "clip.mjpg".to_string(),
            cseq: 1,
            client_rtp_port: None,
            session_id: Some(1),
        };
        // PLAY while still INIT must be ignored (no SETUP happened).
        assert!(worker.handle_request(&play_req).is_none());
        assert_eq!(worker.state(), SessionState::Init);
    }
}
