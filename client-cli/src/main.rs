use std::io;
use std::sync::mpsc;

use clap::Parser;
use rtsp_mjpeg::client::ClientSession;
use rtsp_mjpeg::playback::PlaybackPump;
use rtsp_mjpeg::renderer::LoggingRenderer;

#[derive(Parser)]
#[command(name = "rtsp-mjpeg-client", about = "Standalone RTSP/RTP client for MJPEG video files")]
struct Args {
    /// RTSP server host.
    host: String,
    /// RTSP server port.
    port: u16,
    /// Local UDP port to receive RTP on.
    rtp_port: u16,
    /// Media filename to request.
    filename: String,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut session =
        match ClientSession::connect(&args.host, args.port, args.rtp_port, &args.filename) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to connect to {}:{}: {}", args.host, args.port, e);
                return;
            }
        };

    if let Err(e) = session.setup() {
        eprintln!("SETUP failed: {}", e);
        return;
    }
    if session.state() != rtsp_mjpeg::SessionState::Ready {
        eprintln!("server rejected SETUP (file not found?)");
        return;
    }

    if let Err(e) = session.play() {
        eprintln!("PLAY failed: {}", e);
        return;
    }

    let buffer = session.playback_buffer();
    let (pump_stop_tx, pump_stop_rx) = mpsc::channel();
    let pump_thread = std::thread::spawn(move || {
        let mut pump = PlaybackPump::new(buffer, LoggingRenderer::new());
        pump.run(&pump_stop_rx);
    });

    println!(
        "Streaming {} from {}:{} — press Enter to stop",
        args.filename, args.host, args.port
    );
    let mut input = String::new();
    io::stdin().read_line(&mut input).ok();

    let _ = pump_stop_tx.send(());
    let _ = pump_thread.join();

    if let Err(e) = session.pause() {
        eprintln!("PAUSE failed: {}", e);
    }
    if let Err(e) = session.teardown() {
        eprintln!("TEARDOWN failed: {}", e);
    }
}
