use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use extscan_proto::report::DeviceReporter;
use extscan_proto::scanner::io::{ScanConfig, Scanner};

#[cfg(windows)]
const DEFAULT_PORT: &str = "COM1";
#[cfg(not(windows))]
const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Scan a serial bus for devices that answer the extended-function scan
/// command, at every supported baud rate.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial port the bus is connected to
    #[arg(short = 'p', long, default_value = DEFAULT_PORT)]
    serial_port: String,

    /// Dump every frame sent and received
    #[arg(short, long)]
    debug: bool,

    /// Milliseconds to wait for the reply to a command
    #[arg(long, default_value_t = 100)]
    settle_ms: u64,

    /// Read timeout of the serial port, in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Give up on a baud rate after this many bad replies in a row
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_errors: Option<u32>,
}

impl Args {
    fn scan_config(&self) -> ScanConfig {
        let mut config = ScanConfig::new(self.serial_port.as_str());
        config.settle = Duration::from_millis(self.settle_ms);
        config.read_timeout = Duration::from_millis(self.timeout_ms);
        config.max_consecutive_errors = self.max_errors;
        config
    }
}

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error"));
    if debug {
        builder.filter_module("extscan_proto", LevelFilter::Debug);
    }
    builder.init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = args.scan_config();
    let mut scanner = Scanner::new(config.serial_connector(), config);

    let stdout = io::stdout();
    let mut reporter = DeviceReporter::new(stdout.lock());
    scanner
        .sweep(&mut reporter)
        .with_context(|| format!("Failed to write scan results for {}", args.serial_port))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args() {
        Args::command().debug_assert();

        let args = Args::parse_from(["extscan"]);
        assert_eq!(args.serial_port, DEFAULT_PORT);
        assert!(!args.debug);
        let config = args.scan_config();
        assert_eq!(config.settle, Duration::from_millis(100));
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert_eq!(config.max_consecutive_errors, None);
        assert_eq!(config.baud_rates, extscan_proto::BAUD_RATES.to_vec());

        let args =
            Args::parse_from(["extscan", "-p", "/dev/ttyUSB1", "--debug", "--max-errors", "5"]);
        assert_eq!(args.serial_port, "/dev/ttyUSB1");
        assert!(args.debug);
        assert_eq!(args.scan_config().max_consecutive_errors, Some(5));

        assert!(Args::try_parse_from(["extscan", "--max-errors", "0"]).is_err());
    }
}
