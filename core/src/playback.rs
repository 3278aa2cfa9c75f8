//! Jitter-tolerant playback buffer and pacing consumer.
//!
//! Grounded on `original_source/Client.py`'s `consumeBuffer`: a 10-frame
//! pre-roll gate, re-buffering on starvation, a catch-up drop once depth
//! exceeds 15, and adaptive 33ms-target pacing. The polling shape (timed
//! re-checks instead of a condvar wakeup) is kept from the original —
//! it maps directly onto `mpsc::Receiver::recv_timeout`, the same
//! primitive the rest of this crate uses for cancellable loops.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::renderer::Renderer;

/// Frames needed before playback starts (or resumes after starvation).
const BUFFER_THRESHOLD: usize = 10;
/// Depth above which the pump drops the oldest frames to catch up.
const CATCHUP_THRESHOLD: usize = 15;
/// Interval used while waiting for the buffer to fill or refill.
const BUFFERING_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Target frame budget for the 30fps pacing loop.
const TARGET_FRAME_MS: u64 = 33;

/// Thread-safe FIFO of complete frames, fed by the RTP receive loop and
/// drained by [`PlaybackPump`].
#[derive(Default)]
pub struct PlaybackBuffer {
    queue: Mutex<VecDeque<Vec<u8>>>,
}

impl PlaybackBuffer {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Enqueue a reassembled frame.
    pub fn push(&self, frame: Vec<u8>) {
        self.queue.lock().push_back(frame);
    }

    /// Current number of buffered frames.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pop(&self) -> Option<Vec<u8>> {
        self.queue.lock().pop_front()
    }

    /// Drop oldest frames until depth is at most [`CATCHUP_THRESHOLD`].
    /// Returns the number of frames dropped.
    fn catch_up(&self) -> usize {
        let mut queue = self.queue.lock();
        let mut dropped = 0;
        while queue.len() > CATCHUP_THRESHOLD {
            queue.pop_front();
            dropped += 1;
        }
        dropped
    }
}

/// Drains a [`PlaybackBuffer`] at an adaptive ~30fps pace, presenting
/// each frame through a [`Renderer`].
pub struct PlaybackPump<R: Renderer> {
    buffer: std::sync::Arc<PlaybackBuffer>,
    renderer: R,
    buffering: bool,
}

impl<R: Renderer> PlaybackPump<R> {
    pub fn new(buffer: std::sync::Arc<PlaybackBuffer>, renderer: R) -> Self {
        Self {
            buffer,
            renderer,
            buffering: true,
        }
    }

    /// Run the pacing loop until `stop_rx` fires. Intended to run on its
    /// own thread, one per PLAY span (mirrors the sender loop's shape on
    /// the server side).
    pub fn run(&mut self, stop_rx: &mpsc::Receiver<()>) {
        loop {
            match stop_rx.recv_timeout(self.tick_interval()) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => return,
                Err(mpsc::RecvTimeoutError::Timeout) => {}
            }
            self.tick();
        }
    }

    fn tick_interval(&self) -> Duration {
        if self.buffering {
            BUFFERING_POLL_INTERVAL
        } else if self.buffer.is_empty() {
            BUFFERING_POLL_INTERVAL
        } else {
            Duration::from_millis(0)
        }
    }

    /// One consumption step: buffering gate, catch-up, present, pace.
    /// Returns the delay the caller should wait before the next tick
    /// (used directly by [`run`]'s `recv_timeout`, and exposed for tests
    /// that want to drive the state machine without a real thread).
    pub fn tick(&mut self) -> Duration {
        if self.buffering {
            if self.buffer.len() >= BUFFER_THRESHOLD {
                self.buffering = false;
                tracing::info!("buffering complete, starting playback");
            } else {
                return BUFFERING_POLL_INTERVAL;
            }
        }

        if self.buffer.is_empty() {
            self.buffering = true;
            tracing::info!("buffer empty, re-buffering");
            return BUFFERING_POLL_INTERVAL;
        }

        let dropped = self.buffer.catch_up();
        if dropped > 0 {
            tracing::debug!(dropped, "skipped frames to catch up");
        }

        let start = Instant::now();
        if let Some(frame) = self.buffer.pop() {
            self.renderer.present(&frame);
        }
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let delay = TARGET_FRAME_MS.saturating_sub(elapsed_ms).max(1);
        Duration::from_millis(delay)
    }
}
