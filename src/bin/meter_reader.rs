//! Meter Reader
//!
//! Polls the configured SDM meters on one RS-485 bus and prints a status line
//! per cycle until Ctrl+C / SIGTERM.
//!
//! Usage: meter_reader /dev/ttyUSB0 --meter front_flat=SDM120@1 --meter heat_pump=SDM72@3/CDAB
//!
//! Exit codes: 0 after shutdown, 1 on invalid configuration, -1 when the
//! serial port cannot be opened.

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meter_reader::constants::{DEFAULT_BAUD_RATE, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RESPONSE_TIMEOUT_MS};
use meter_reader::shutdown::wait_for_signal;
use meter_reader::{
    build_meters, MeterError, MeterSpec, Poller, RtuConfig, RtuTransport, Shutdown, DEFAULT_METERS,
};

const EXIT_CONFIG: i32 = 1;
const EXIT_CONNECT: i32 = -1;

/// Poll Eastron SDM electricity meters over Modbus RTU
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Serial device of the RS-485 adapter
    #[clap(env = "METER_PORT")]
    port: String,

    /// Baud rate (parity none, 8 data bits, 1 stop bit)
    #[clap(short, long, default_value_t = DEFAULT_BAUD_RATE, env = "METER_BAUD")]
    baud: u32,

    /// Response timeout per transaction in milliseconds
    #[clap(long, default_value_t = DEFAULT_RESPONSE_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Pause between cycles in milliseconds
    #[clap(short, long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    interval_ms: u64,

    /// Stop after this many cycles
    #[clap(long)]
    cycles: Option<u64>,

    /// Meter on the bus as NAME=MODEL@UNIT[/ORDER], repeatable
    #[clap(short, long = "meter", value_name = "NAME=MODEL@UNIT[/ORDER]", default_values = DEFAULT_METERS)]
    meters: Vec<MeterSpec>,

    /// Log filter (trace, debug, info, warn, error or a RUST_LOG directive)
    #[clap(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored log output
    #[clap(long)]
    no_color: bool,
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|e| {
        eprintln!("Invalid log level '{}': {}, falling back to info", args.log_level, e);
        EnvFilter::new("info")
    });

    // stdout carries the status lines
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!args.no_color)
                .with_target(false),
        )
        .init();
}

async fn run(args: Args) -> i32 {
    let meters = match build_meters(&args.meters) {
        Ok(meters) => meters,
        Err(e) => {
            error!(error = %e, "Invalid meter configuration");
            return EXIT_CONFIG;
        }
    };
    for meter in &meters {
        info!(
            meter = meter.name(),
            model = meter.model(),
            unit = meter.unit(),
            word_order = %meter.word_order(),
            "Meter configured"
        );
    }

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        trigger.trigger();
    });

    let config = RtuConfig::new(&args.port)
        .with_baud_rate(args.baud)
        .with_timeout(Duration::from_millis(args.timeout_ms));
    let mut poller = Poller::new(meters, shutdown).with_interval(Duration::from_millis(args.interval_ms));
    if let Some(cycles) = args.cycles {
        poller = poller.with_max_cycles(cycles);
    }

    let mut stdout = std::io::stdout();
    match poller.run(RtuTransport::new(config), &mut stdout).await {
        Ok(_) => {
            info!("Exit");
            0
        }
        Err(MeterError::Connection { message }) => {
            error!("Unable to connect to {}: {}", args.port, message);
            EXIT_CONNECT
        }
        Err(e) => {
            error!(error = %e, "Polling aborted");
            EXIT_CONFIG
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Unable to start runtime");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let code = runtime.block_on(run(args));
    drop(runtime);
    std::process::exit(code);
}
