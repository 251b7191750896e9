use std::fs;
use std::time::Instant;

use clap::Parser;
use log::info;
use rudp::{ReceiveOutcome, RudpSocket};

/// Accepts one RUDP connection, reassembles the incoming send, writes it to
/// a file, and prints elapsed time and throughput.
#[derive(Parser, Debug)]
struct Args {
    /// Local port to bind and listen on.
    #[arg(short, long)]
    port: u16,

    /// Where to write the received payload.
    #[arg(short, long, default_value = "received.bin")]
    output: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut socket = RudpSocket::accept(args.port).expect("accept failed");
    info!("connection accepted on port {}", args.port);

    let mut buffer = Vec::new();
    let start = Instant::now();
    let mut elapsed = None;

    loop {
        match socket.receive().expect("receive failed") {
            ReceiveOutcome::Continue(chunk) => buffer.extend_from_slice(&chunk),
            ReceiveOutcome::Terminal(chunk) => {
                buffer.extend_from_slice(&chunk);
                elapsed.get_or_insert_with(|| start.elapsed());
            }
            ReceiveOutcome::PeerClosed => break,
        }
    }

    let elapsed = elapsed.unwrap_or_else(|| start.elapsed());
    fs::write(&args.output, &buffer).expect("failed to write output file");

    let seconds = elapsed.as_secs_f64();
    let megabytes = buffer.len() as f64 / (1024.0 * 1024.0);

    println!("----------------------------------");
    println!("- * Statistics * -");
    println!("- Time: {:.2} ms", elapsed.as_millis());
    if seconds > 0.0 {
        println!("- Bandwidth: {:.2} MB/s", megabytes / seconds);
    }
    println!("----------------------------------");
}
