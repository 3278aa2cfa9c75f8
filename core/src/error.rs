//! Error types for the RTSP/RTP MJPEG streaming core.
//!
//! Per spec, most failure modes in this crate are *not* surfaced as
//! `Result::Err` — malformed RTSP, CSeq/session mismatches, RTP send
//! errors, and packet loss are all handled in place (logged and/or
//! silently ignored) because the protocol defines them as recoverable.
//! [`StreamError`] exists only for the handful of conditions that are
//! genuinely fatal to the operation in progress: opening the media file
//! at SETUP, and binding/configuring sockets.

/// Errors that can occur setting up a streaming session.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Underlying I/O error (file open, socket bind/send/recv).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `VideoStream::open` could not open the requested media file.
    /// Maps to a 404 reply at the RTSP layer (see `ServerWorker::handle_setup`).
    #[error("media file not found: {0}")]
    MediaNotFound(String),

    /// SETUP completed but no RTP client port was supplied in the
    /// Transport header, so PLAY cannot address the client.
    #[error("no RTP client port negotiated for session {0}")]
    TransportNotConfigured(u32),
}

/// Convenience alias for `Result<T, StreamError>`.
pub type Result<T> = std::result::Result<T, StreamError>;
