//! Integration test: a full SETUP -> PLAY -> PAUSE -> TEARDOWN round
//! trip over real loopback TCP (control) and UDP (data) sockets.
//!
//! Mirrors the teacher crate's `tests/integration.rs` shape (fixed
//! ephemeral port, raw socket requests, response assertions) but speaks
//! this crate's `\n`-only, positional RTSP grammar instead of the
//! RFC-general `\r\n` form.

use std::fs::File;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rtsp_mjpeg::rtsp::{RtspRequest, RtspResponse};
use rtsp_mjpeg::server::listener::accept_loop;

fn write_length_prefixed_file(path: &std::path::Path, frames: &[&[u8]]) {
    let mut file = File::create(path).unwrap();
    for frame in frames {
        write!(file, "{:05}", frame.len()).unwrap();
        file.write_all(frame).unwrap();
    }
}

fn send_request(stream: &mut TcpStream, request: &RtspRequest) -> RtspResponse {
    stream.write_all(request.serialize().as_bytes()).unwrap();
    let mut buf = [0u8; 256];
    let n = stream.read(&mut buf).expect("reply read");
    RtspResponse::parse(&String::from_utf8_lossy(&buf[..n])).expect("parse reply")
}

/// Spins up the accept loop on an ephemeral port and returns its address
/// plus a handle that stops it on drop.
struct TestServer {
    addr: std::net::SocketAddr,
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl TestServer {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        let thread = std::thread::spawn(move || accept_loop(listener, r));
        Self {
            addr,
            running,
            thread: Some(thread),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

#[test]
fn setup_play_pause_teardown_round_trip() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("rtsp_mjpeg_integration_{}.mjpg", std::process::id()));
    write_length_prefixed_file(&path, &[b"frame-bytes-one", b"frame-bytes-two"]);

    let server = TestServer::start();
    let rtp_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    rtp_socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let rtp_port = rtp_socket.local_addr().unwrap().port();

    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let setup = RtspRequest {
        method: "SETUP".to_string(),
        filename: path.to_str().unwrap().to_string(),
        cseq: 1,
        client_rtp_port: Some(rtp_port),
        session_id: None,
    };
    let setup_resp = send_request(&mut stream, &setup);
    assert_eq!(setup_resp.status_code, 200);
    let session_id = setup_resp.session_id.expect("SETUP must carry a session id");

    let play = RtspRequest {
        method: "PLAY".to_string(),
        filename: path.to_str().unwrap().to_string(),
        cseq: 2,
        client_rtp_port: None,
        session_id: Some(session_id),
    };
    let play_resp = send_request(&mut stream, &play);
    assert_eq!(play_resp.status_code, 200);
    assert_eq!(play_resp.session_id, Some(session_id));

    // Two frames plus an EOS sentinel should arrive over RTP.
    let mut buf = [0u8; 4096];
    let mut frames_seen = 0;
    let mut eos_seen = false;
    for _ in 0..3 {
        let n = rtp_socket.recv(&mut buf).expect("RTP datagram");
        let packet = rtsp_mjpeg::rtp::RtpPacket::decode(&buf[..n]);
        assert!(packet.marker(), "single-packet frames always carry the marker");
        if packet.is_eos() {
            eos_seen = true;
        } else {
            frames_seen += 1;
        }
    }
    assert_eq!(frames_seen, 2);
    assert!(eos_seen);

    let pause = RtspRequest {
        method: "PAUSE".to_string(),
        filename: path.to_str().unwrap().to_string(),
        cseq: 3,
        client_rtp_port: None,
        session_id: Some(session_id),
    };
    let pause_resp = send_request(&mut stream, &pause);
    assert_eq!(pause_resp.status_code, 200);

    let teardown = RtspRequest {
        method: "TEARDOWN".to_string(),
        filename: path.to_str().unwrap().to_string(),
        cseq: 4,
        client_rtp_port: None,
        session_id: Some(session_id),
    };
    let teardown_resp = send_request(&mut stream, &teardown);
    assert_eq!(teardown_resp.status_code, 200);

    std::fs::remove_file(&path).ok();
}

#[test]
fn setup_missing_file_gets_404_with_no_session() {
    let server = TestServer::start();
    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let setup = RtspRequest {
        method: "SETUP".to_string(),
        filename: "/no/such/file.mjpg".to_string(),
        cseq: 1,
        client_rtp_port: Some(25000),
        session_id: None,
    };
    let resp = send_request(&mut stream, &setup);
    assert_eq!(resp.status_code, 404);
    assert_eq!(resp.session_id, None);
}

#[test]
fn fragmented_frame_reassembles_exactly_with_marker_only_on_last_chunk() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("rtsp_mjpeg_integration_frag_{}.mjpg", std::process::id()));
    // One frame larger than MAX_PAYLOAD (1400) forces fragmentation.
    let big_frame: Vec<u8> = (0..3500u32).map(|i| (i % 256) as u8).collect();
    write_length_prefixed_file(&path, &[&big_frame]);

    let server = TestServer::start();
    let rtp_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    rtp_socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let rtp_port = rtp_socket.local_addr().unwrap().port();

    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let setup = RtspRequest {
        method: "SETUP".to_string(),
        filename: path.to_str().unwrap().to_string(),
        cseq: 1,
        client_rtp_port: Some(rtp_port),
        session_id: None,
    };
    let setup_resp = send_request(&mut stream, &setup);
    let session_id = setup_resp.session_id.unwrap();

    let play = RtspRequest {
        method: "PLAY".to_string(),
        filename: path.to_str().unwrap().to_string(),
        cseq: 2,
        client_rtp_port: None,
        session_id: Some(session_id),
    };
    send_request(&mut stream, &play);

    let mut buf = [0u8; 4096];
    let mut reassembled = Vec::new();
    let mut saw_marker_before_last = false;
    loop {
        let n = rtp_socket.recv(&mut buf).unwrap();
        let packet = rtsp_mjpeg::rtp::RtpPacket::decode(&buf[..n]);
        if packet.is_eos() {
            break;
        }
        reassembled.extend_from_slice(packet.payload());
        if packet.marker() {
            if reassembled.len() < big_frame.len() {
                saw_marker_before_last = true;
            }
            break;
        }
    }

    assert!(!saw_marker_before_last, "marker must only be set on the last fragment");
    assert_eq!(reassembled, big_frame);

    std::fs::remove_file(&path).ok();
}
