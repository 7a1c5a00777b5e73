use clap::Parser;
use dlms_rs::hdlc::serial::open_port;
use dlms_rs::{init_logger, log_info, ClientConfig, DlmsError, MeterReader, SystemClock};
use std::time::Duration;

/// Read an electricity meter over DLMS/COSEM on a serial line.
#[derive(Parser)]
#[command(name = "dlms-read", version, about)]
struct Cli {
    /// Serial device connected to the meter's optical or RS-232 port
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Line rate (8N1)
    #[arg(short, long, default_value_t = 9_600)]
    baud: u32,

    /// 16-character low-level-security password
    #[arg(long, default_value = "1111111111111111")]
    password: String,

    /// Time-of-day zones to read (0..=8)
    #[arg(long, default_value_t = 4)]
    tod_zones: u8,

    /// Abort the session after this many seconds
    #[arg(long)]
    budget_secs: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), DlmsError> {
    init_logger();
    let cli = Cli::parse();

    let mut password = [0u8; 16];
    let bytes = cli.password.as_bytes();
    if bytes.len() != password.len() {
        eprintln!("password must be exactly 16 characters");
        std::process::exit(2);
    }
    password.copy_from_slice(bytes);

    let config = ClientConfig {
        password,
        baud: cli.baud,
        read_tod_zones: cli.tod_zones.min(8),
        session_budget: cli.budget_secs.map(Duration::from_secs),
        ..ClientConfig::default()
    };

    log_info(&format!("reading meter on {} at {} baud", cli.port, cli.baud));
    let port = open_port(&cli.port, config.baud)?;
    let mut reader = MeterReader::new(port, config, SystemClock);
    let reading = reader.read_cycle().await?;
    println!("{reading}");
    Ok(())
}
