//! Human readable output of a sweep.
//!
//! [`DeviceReporter`] is the only thing that prints device rows. It numbers
//! the devices across the whole run and prints the table header once, right
//! before the first row.

use std::io::{self, Write};

use crate::scanner::io::{RateOutcome, SweepSummary};
use crate::scanner::EndReason;
use crate::types::{DeviceRecord, DiscoveredDevice};
use crate::Error;

const TABLE_HEADER: &str = "| #    | Serial         | Slave ID   |";
const TABLE_RULE: &str = "|------|----------------|------------|";

/// Formats `bytes` the way the diagnostics print them, `0xFD 0x46 ...`.
fn hex_list(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("0x{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Writes the device table and status lines to `W`.
#[derive(Debug)]
pub struct DeviceReporter<W: Write> {
    out: W,
    count: u32,
    header_printed: bool,
}

impl<W: Write> DeviceReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            count: 0,
            header_printed: false,
        }
    }

    /// Number the device and print its row.
    pub fn report(&mut self, record: DeviceRecord) -> io::Result<DiscoveredDevice> {
        self.count += 1;
        let device = DiscoveredDevice {
            sequence_number: self.count,
            serial_number: record.serial_number,
            bus_address: record.bus_address,
        };

        if !self.header_printed {
            writeln!(self.out, "{}", TABLE_HEADER)?;
            writeln!(self.out, "{}", TABLE_RULE)?;
            self.header_printed = true;
        }
        writeln!(
            self.out,
            "| {:<4} | {:<14} | {:<10} |",
            device.sequence_number, *device.serial_number, *device.bus_address
        )?;
        self.out.flush()?;
        Ok(device)
    }

    /// Devices reported so far.
    pub fn devices_reported(&self) -> u32 {
        self.count
    }

    pub fn baud_rate_started(&mut self, baud_rate: u32) -> io::Result<()> {
        writeln!(self.out, "Scanning bus at {} baud...", baud_rate)?;
        self.out.flush()
    }

    pub fn open_failed(&mut self, baud_rate: u32, error: &Error) -> io::Result<()> {
        writeln!(self.out, "Error opening port at {} baud: {}", baud_rate, error)
    }

    pub fn bus_error(&mut self, baud_rate: u32, error: &Error) -> io::Result<()> {
        writeln!(self.out, "Bus error at {} baud: {}", baud_rate, error)
    }

    /// One diagnostic line per error class.
    pub fn exchange_rejected(&mut self, error: &Error) -> io::Result<()> {
        match error {
            Error::ChecksumMismatch { payload, .. } => {
                writeln!(self.out, "Response checksum error.")?;
                writeln!(
                    self.out,
                    "Full response (without checksum): {}",
                    hex_list(payload)
                )
            }
            Error::MalformedDeviceRecord { .. } => writeln!(
                self.out,
                "Wrong response size for serial number and slave ID, ignoring it."
            ),
            Error::MalformedFrame { .. } => {
                writeln!(self.out, "Response too short, ignoring it.")
            }
            Error::UnrecognizedFrame { .. } => {
                writeln!(self.out, "Received an invalid response, ignoring it.")
            }
            other => writeln!(self.out, "{}", other),
        }
    }

    pub fn session_ended(&mut self, reason: EndReason) -> io::Result<()> {
        match reason {
            EndReason::ScanComplete | EndReason::ScanEnded => writeln!(self.out, "Scan complete."),
            EndReason::TooManyErrors(n) => {
                writeln!(self.out, "Scan stopped after {} bad responses in a row.", n)
            }
            EndReason::BusError => writeln!(self.out, "Scan aborted."),
        }
    }

    pub fn summary(&mut self, summary: &SweepSummary) -> io::Result<()> {
        let skipped = summary
            .rates
            .iter()
            .filter(|(_, outcome)| *outcome == RateOutcome::OpenFailed)
            .count();
        write!(
            self.out,
            "Found {} device(s) at {} baud rate(s)",
            summary.devices_found(),
            summary.rates.len() - skipped
        )?;
        if skipped > 0 {
            write!(self.out, ", {} skipped", skipped)?;
        }
        writeln!(self.out, ".")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
