use clap::Parser;
use file_tailer::{TailConfig, TailSession, WriterSink};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Print lines appended to a file as they arrive, like `tail -f`.
#[derive(Parser, Debug)]
#[command(name = "tail", version, about)]
struct Args {
    /// File to follow
    file: PathBuf,

    /// Poll interval in milliseconds (0 reads once and exits)
    #[arg(short = 'i', long = "interval", value_name = "MS", default_value_t = 1000)]
    interval_ms: u64,

    /// Print the existing content before following
    #[arg(long)]
    from_start: bool,

    /// Log polling activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = TailConfig::new(&args.file)
        .with_poll_interval(Duration::from_millis(args.interval_ms))
        .start_at_beginning(args.from_start);

    let mut session = TailSession::new(config);
    if let Err(e) = session.bind_sink(WriterSink::stdout()).and_then(|()| session.start()) {
        eprintln!("Error starting tail of {}: {}", args.file.display(), e);
        process::exit(1);
    }

    let stop = session.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    if let Err(e) = session.join().await {
        eprintln!("Error reading {}: {}", args.file.display(), e);
        process::exit(1);
    }
}
