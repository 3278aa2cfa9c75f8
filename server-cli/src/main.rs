use std::io;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use rtsp_mjpeg::server::listener::accept_loop;

#[derive(Parser)]
#[command(name = "rtsp-mjpeg-server", about = "Standalone RTSP/RTP server for MJPEG video files")]
struct Args {
    /// RTSP port to listen on.
    #[arg(long, short, default_value_t = 8554)]
    port: u16,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let bind_addr = format!("0.0.0.0:{}", args.port);

    let listener = match TcpListener::bind(&bind_addr) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", bind_addr, e);
            return;
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let accept_running = running.clone();
    let accept_thread = std::thread::spawn(move || accept_loop(listener, accept_running));

    println!("RTSP/MJPEG server on {} — press Enter to stop", bind_addr);
    let mut input = String::new();
    io::stdin().read_line(&mut input).ok();

    running.store(false, Ordering::SeqCst);
    let _ = accept_thread.join();
}
