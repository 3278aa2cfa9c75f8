//! # rtsp_mjpeg — a small RTSP/RTP streaming core for MJPEG video
//!
//! Implements just enough of RTSP 1.0 and RTP to SETUP/PLAY/PAUSE/
//! TEARDOWN a single MJPEG stream between one server and one client:
//! no congestion control, no RTCP/NACK, no TLS, no multiplexed sessions.
//! Display is out of scope too — the client side hands decoded-but-not-
//! yet-decoded JPEG bytes to a [`renderer::Renderer`] and stops there.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │  CLI binaries (server-cli / client-cli)    │
//! ├───────────────────────────────────────────┤
//! │  server — ServerWorker, accept loop        │
//! │  client — ClientSession, RTP receiver      │
//! ├───────────────────────────────────────────┤
//! │  rtsp    — request/response grammar        │
//! │  session — shared INIT/READY/PLAYING fsm   │
//! │  playback — pre-roll + catch-up pacing     │
//! │  renderer — GUI boundary trait             │
//! ├───────────────────────────────────────────┤
//! │  rtp          — 12-byte header encode/decode│
//! │  video_stream — MJPEG frame extraction      │
//! │  error        — StreamError / Result        │
//! └───────────────────────────────────────────┘
//! ```
//!
//! ## Crate layout
//!
//! - [`rtp`] — [`rtp::RtpPacket`] encode/decode, fragmentation constants.
//! - [`video_stream`] — [`video_stream::VideoStream`], dual-format MJPEG demuxing.
//! - [`session`] — [`session::SessionState`] and session id generation.
//! - [`rtsp`] — [`rtsp::RtspRequest`] / [`rtsp::RtspResponse`] wire grammar.
//! - [`server`] — [`server::ServerWorker`] and the TCP accept loop.
//! - [`client`] — [`client::ClientSession`] and the RTP receive loop.
//! - [`playback`] — [`playback::PlaybackBuffer`] and [`playback::PlaybackPump`].
//! - [`renderer`] — [`renderer::Renderer`] trait and [`renderer::LoggingRenderer`].
//! - [`error`] — [`error::StreamError`] and [`error::Result`].

pub mod client;
pub mod error;
pub mod playback;
pub mod renderer;
pub mod rtp;
pub mod rtsp;
pub mod server;
pub mod session;
pub mod video_stream;

pub use client::ClientSession;
pub use error::{Result, StreamError};
pub use playback::{PlaybackBuffer, PlaybackPump};
pub use renderer::{LoggingRenderer, Renderer};
pub use rtp::RtpPacket;
pub use rtsp::{RtspRequest, RtspResponse};
pub use server::ServerWorker;
pub use session::SessionState;
pub use video_stream::VideoStream;
