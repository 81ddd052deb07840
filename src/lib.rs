//! Discovery of slave devices that implement the extended-function (0x46)
//! scan command on a half-duplex serial bus.
//!
//! The bus master broadcasts a start-scan command, and every device that
//! hasn't been enumerated yet takes part in an on-bus arbitration. The winner
//! answers with its serial number and bus address. The master then keeps
//! sending continue-scan until the bus reports the end of the scan, or stays
//! silent. Since the devices may be configured for different baud rates, the
//! whole exchange is repeated for every rate in [`BAUD_RATES`].
//!
//! The protocol part is sans-io: [`frame`] builds and classifies frames and
//! [`scanner::ScanSession`] is the per-baud-rate state machine. The
//! [`scanner::io::Scanner`] drives sessions over a [`transport::Connector`],
//! and reports everything it finds to a [`report::DeviceReporter`].
//!
//! ## Example
//! ```
//! use extscan_proto::frame::{build_command, parse_response, Response};
//! use extscan_proto::{Subcommand, BROADCAST_ADDRESS, EXTENDED_FUNCTION_CODE};
//!
//! let cmd = build_command(BROADCAST_ADDRESS, EXTENDED_FUNCTION_CODE, Subcommand::StartScan);
//! assert_eq!(cmd.as_slice(), &[0xFD, 0x46, 0x01, 0x13, 0x90]);
//!
//! // An empty read means the bus had nothing more to say.
//! assert_eq!(parse_response(&[]).unwrap(), Response::ScanComplete);
//! ```

#![deny(unsafe_code)]

use core::time::Duration;

mod buffer;
pub mod crc;
mod error;
pub mod frame;
mod nom_parser;
pub mod report;
pub mod scanner;
pub mod transport;
pub mod types;

pub use crate::error::Error;
pub use crate::types::{BusAddress, DeviceRecord, DiscoveredDevice, SerialNumber, Subcommand};

/// Destination address of every scan command. Devices echo it in their replies.
pub const BROADCAST_ADDRESS: u8 = 0xFD;

/// Function code of the vendor extended-function command family.
pub const EXTENDED_FUNCTION_CODE: u8 = 0x46;

/// The line idles high, so baud mismatches show up as 0xFF bytes in the input.
pub const IDLE_FILL: u8 = 0xFF;

/// Candidate baud rates, tried in this order.
pub const BAUD_RATES: [u32; 8] = [115_200, 57_600, 38_400, 19_200, 9_600, 4_800, 2_400, 1_200];

/// Time between sending a command and reading the reply.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// Read timeout the serial port is opened with.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound on the non-fill bytes kept from a single reply. Anything past
/// it is drained from the port and dropped.
pub const MAX_RESPONSE_LEN: usize = 256;
