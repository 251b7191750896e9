use std::fs;
use std::time::Instant;

use clap::Parser;
use log::info;
use rand::RngCore;
use rudp::RudpSocket;

/// Connects to an RUDP receiver and sends a file (or freshly generated
/// random data) over the wire, then prints elapsed time and throughput.
#[derive(Parser, Debug)]
struct Args {
    /// Receiver address, e.g. 127.0.0.1
    #[arg(short = 'i', long)]
    ip: String,

    /// Receiver port.
    #[arg(short = 'p', long)]
    port: u16,

    /// File to send. When omitted, `--size` bytes of random data are sent.
    #[arg(short, long)]
    file: Option<String>,

    /// Size of the randomly generated payload, in bytes.
    #[arg(short, long, default_value_t = 2 * 1024 * 1024)]
    size: usize,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let message = match &args.file {
        Some(path) => fs::read(path).expect("failed to read input file"),
        None => {
            let mut buf = vec![0u8; args.size];
            rand::thread_rng().fill_bytes(&mut buf);
            buf
        }
    };
    info!("prepared {} bytes to send", message.len());

    let mut socket = RudpSocket::connect((args.ip.as_str(), args.port)).expect("connect failed");
    info!("connected to {}:{}", args.ip, args.port);

    let start = Instant::now();
    let sent = socket.send(&message).expect("send failed");
    let elapsed = start.elapsed();

    let seconds = elapsed.as_secs_f64();
    let megabytes = sent as f64 / (1024.0 * 1024.0);

    println!("----------------------------------");
    println!("- * Statistics * -");
    println!("- Time: {:.2} ms", elapsed.as_millis());
    if seconds > 0.0 {
        println!("- Bandwidth: {:.2} MB/s", megabytes / seconds);
    }
    println!("----------------------------------");

    socket.close().expect("close failed");
}
