//! The per-baud-rate scan state machine.
//!
//! [`ScanSession`] doesn't do any I/O. Ask it for the next command with
//! [`next_command()`](ScanSession::next_command), send it, and feed whatever
//! came back to [`receive()`](ScanSession::receive). Repeat until
//! `next_command()` returns `None`. [`io::Scanner`] does exactly that over a
//! [`Connector`](crate::transport::Connector), for every configured baud rate.
//!
//! A non-terminal error in reply to the start command doesn't restart the
//! scan. The session moves on to continue-scan, the same as after a device
//! was found, so every exchange sends a fresh command.

use log::{info, warn};

use crate::frame::{parse_response, scan_command, Response, COMMAND_LEN};
use crate::types::{DeviceRecord, Subcommand};
use crate::Error;

/// Where a [`ScanSession`] is in its exchange.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum ScanState {
    /// Nothing sent yet.
    Idle,
    /// Start-scan sent, waiting for the first reply.
    Started,
    /// At least one reply received, continue-scan is next.
    Continuing,
    /// Terminal, see [`EndReason`].
    Ended,
}

/// Why a session ended.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum EndReason {
    /// The bus stayed silent.
    ScanComplete,
    /// The bus sent the end-scan marker.
    ScanEnded,
    /// The consecutive error limit was reached.
    TooManyErrors(u32),
    /// The transport failed.
    BusError,
}

/// Outcome of one exchange, as returned by [`ScanSession::receive`].
#[derive(Debug)]
pub enum ScanEvent {
    DeviceFound(DeviceRecord),
    Ended(EndReason),
    /// The reply was unusable. The session goes on unless the error limit
    /// was reached, check [`ScanSession::is_ended`].
    Rejected(Error),
}

/// Scan state machine for a single baud rate.
#[derive(Debug, Clone)]
pub struct ScanSession {
    baud_rate: u32,
    state: ScanState,
    end_reason: Option<EndReason>,
    consecutive_errors: u32,
    error_limit: Option<u32>,
}

impl ScanSession {
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            state: ScanState::Idle,
            end_reason: None,
            consecutive_errors: 0,
            error_limit: None,
        }
    }

    /// End the session after `limit` rejected replies in a row.
    /// `None`, the default, only ends it when the bus says so.
    pub fn with_error_limit(mut self, limit: Option<u32>) -> Self {
        self.error_limit = limit;
        self
    }

    pub const fn state(&self) -> ScanState {
        self.state
    }

    pub fn is_ended(&self) -> bool {
        self.state == ScanState::Ended
    }

    pub const fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// The command to send next, `None` once the session has ended.
    pub fn next_command(&mut self) -> Option<[u8; COMMAND_LEN]> {
        let subcommand = match self.state {
            ScanState::Idle => {
                self.state = ScanState::Started;
                Subcommand::StartScan
            }
            ScanState::Started | ScanState::Continuing => Subcommand::ContinueScan,
            ScanState::Ended => return None,
        };
        Some(scan_command(subcommand))
    }

    /// Classify the bytes read back after the last command.
    pub fn receive(&mut self, raw: &[u8]) -> ScanEvent {
        if let (ScanState::Ended, Some(reason)) = (self.state, self.end_reason) {
            return ScanEvent::Ended(reason);
        }

        match parse_response(raw) {
            Ok(Response::DeviceFound(record)) => {
                self.consecutive_errors = 0;
                self.state = ScanState::Continuing;
                ScanEvent::DeviceFound(record)
            }
            Ok(Response::ScanComplete) => ScanEvent::Ended(self.end(EndReason::ScanComplete)),
            Ok(Response::ScanEnded) => ScanEvent::Ended(self.end(EndReason::ScanEnded)),
            Err(error) => {
                self.consecutive_errors += 1;
                self.state = ScanState::Continuing;
                if let Some(limit) = self.error_limit {
                    if self.consecutive_errors >= limit {
                        warn!(
                            "Giving up at {} baud after {} bad replies",
                            self.baud_rate, self.consecutive_errors
                        );
                        self.end(EndReason::TooManyErrors(self.consecutive_errors));
                    }
                }
                ScanEvent::Rejected(error)
            }
        }
    }

    /// The transport failed, the session can't go on.
    pub fn fail(&mut self) -> EndReason {
        self.end(EndReason::BusError)
    }

    fn end(&mut self, reason: EndReason) -> EndReason {
        info!("Scan at {} baud ended: {:?}", self.baud_rate, reason);
        self.state = ScanState::Ended;
        self.end_reason = Some(reason);
        reason
    }
}

pub mod io {
    //! Runs scan sessions over a real transport.

    use std::io::Write;
    use std::thread;
    use std::time::Duration;

    use log::{debug, info, warn};

    use super::{EndReason, ScanEvent, ScanSession};
    use crate::buffer::Buffer;
    use crate::report::DeviceReporter;
    use crate::transport::{Connector, SerialConnector, Transport};
    use crate::{Error, BAUD_RATES, DEFAULT_READ_TIMEOUT, DEFAULT_SETTLE};

    /// Run-wide settings of a sweep.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ScanConfig {
        /// Serial port path.
        pub port: String,
        /// Tried in order, each exactly once.
        pub baud_rates: Vec<u32>,
        /// Delay between a command and reading its reply.
        pub settle: Duration,
        pub read_timeout: Duration,
        /// See [`ScanSession::with_error_limit`].
        pub max_consecutive_errors: Option<u32>,
    }

    impl ScanConfig {
        pub fn new(port: impl Into<String>) -> Self {
            Self {
                port: port.into(),
                baud_rates: BAUD_RATES.to_vec(),
                settle: DEFAULT_SETTLE,
                read_timeout: DEFAULT_READ_TIMEOUT,
                max_consecutive_errors: None,
            }
        }

        /// A connector for the configured serial port.
        pub fn serial_connector(&self) -> SerialConnector {
            SerialConnector::new(self.port.as_str()).with_read_timeout(self.read_timeout)
        }
    }

    /// What happened at one baud rate.
    #[derive(PartialEq, Eq, Debug, Copy, Clone)]
    pub enum RateOutcome {
        /// The port couldn't be opened, the rate was skipped.
        OpenFailed,
        Scanned { devices: u32, reason: EndReason },
    }

    /// Result of a full sweep, one entry per attempted rate.
    #[derive(PartialEq, Eq, Debug, Default, Clone)]
    pub struct SweepSummary {
        pub rates: Vec<(u32, RateOutcome)>,
    }

    impl SweepSummary {
        pub fn devices_found(&self) -> u32 {
            self.rates
                .iter()
                .map(|(_, outcome)| match outcome {
                    RateOutcome::Scanned { devices, .. } => *devices,
                    RateOutcome::OpenFailed => 0,
                })
                .sum()
        }

        pub fn attempted_rates(&self) -> Vec<u32> {
            self.rates.iter().map(|(rate, _)| *rate).collect()
        }
    }

    /// Sweeps all configured baud rates through a [`Connector`].
    pub struct Scanner<C: Connector> {
        connector: C,
        config: ScanConfig,
    }

    impl<C: Connector> Scanner<C> {
        pub fn new(connector: C, config: ScanConfig) -> Self {
            Self { connector, config }
        }

        /// Scan every configured baud rate once, in order.
        ///
        /// Per-rate failures are reported and skipped.
        /// # Errors
        /// Only if writing to the reporter fails.
        pub fn sweep<W: Write>(
            &mut self,
            reporter: &mut DeviceReporter<W>,
        ) -> std::io::Result<SweepSummary> {
            let mut summary = SweepSummary::default();
            for baud_rate in self.config.baud_rates.clone() {
                let outcome = self.scan_baud_rate(baud_rate, reporter)?;
                summary.rates.push((baud_rate, outcome));
            }
            reporter.summary(&summary)?;
            Ok(summary)
        }

        /// Run one session. The port is closed when this returns.
        pub fn scan_baud_rate<W: Write>(
            &mut self,
            baud_rate: u32,
            reporter: &mut DeviceReporter<W>,
        ) -> std::io::Result<RateOutcome> {
            info!("Scanning {} at {} baud", self.connector.port_name(), baud_rate);
            reporter.baud_rate_started(baud_rate)?;
            let mut port = match self.connector.open(baud_rate) {
                Ok(port) => port,
                Err(error) => {
                    warn!("{}", error);
                    reporter.open_failed(baud_rate, &error)?;
                    return Ok(RateOutcome::OpenFailed);
                }
            };

            let mut session = ScanSession::new(baud_rate)
                .with_error_limit(self.config.max_consecutive_errors);
            let mut devices = 0;
            while let Some(command) = session.next_command() {
                let reply = match self.exchange(&mut port, &command) {
                    Ok(reply) => reply,
                    Err(error) => {
                        warn!("{}", error);
                        session.fail();
                        reporter.bus_error(baud_rate, &error)?;
                        continue;
                    }
                };
                match session.receive(reply.as_slice()) {
                    ScanEvent::DeviceFound(record) => {
                        debug!("Device response: {}", hex::encode_upper(reply.as_slice()));
                        devices += 1;
                        reporter.report(record)?;
                    }
                    ScanEvent::Ended(_) => {}
                    ScanEvent::Rejected(error) => {
                        warn!("{}", error);
                        reporter.exchange_rejected(&error)?;
                    }
                }
            }

            let reason = session.end_reason().unwrap_or(EndReason::BusError);
            reporter.session_ended(reason)?;
            Ok(RateOutcome::Scanned { devices, reason })
        }

        fn exchange(&self, port: &mut C::Port, command: &[u8]) -> Result<Buffer, Error> {
            debug!("TX {}", hex::encode_upper(command));
            port.write_all(command)?;
            thread::sleep(self.config.settle);

            let raw = port.read_available()?;
            let mut reply = Buffer::new();
            reply.write(&raw);
            debug!("RX {} ({} kept)", hex::encode_upper(&raw), reply.len());
            if reply.overflow() > 0 {
                warn!("Dropped {} bytes of an oversized reply", reply.overflow());
            }
            Ok(reply)
        }
    }
}
