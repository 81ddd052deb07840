//! Building scan commands and classifying the replies.
//!
//! Every frame on the bus has the same layout:
//!
//! | Offset   | Field                                     |
//! |----------|-------------------------------------------|
//! | 0        | address, always [`BROADCAST_ADDRESS`]     |
//! | 1        | function code, [`EXTENDED_FUNCTION_CODE`] |
//! | 2        | [`Subcommand`]                            |
//! | 3..N-2   | payload, empty for commands               |
//! | N-2..N   | CRC16/MODBUS of the preceding bytes, LE   |
//!
//! A device-found reply carries a four byte big-endian serial number and a
//! one byte bus address as payload.

use snafu::{ensure, OptionExt};

use crate::crc::checksum;
use crate::error::{
    ChecksumMismatchSnafu, Error, MalformedDeviceRecordSnafu, MalformedFrameSnafu,
    UnrecognizedFrameSnafu,
};
use crate::nom_parser;
use crate::types::{DeviceRecord, Subcommand};
use crate::{BROADCAST_ADDRESS, EXTENDED_FUNCTION_CODE, IDLE_FILL};

/// Length of every command frame.
pub const COMMAND_LEN: usize = 5;

/// Header and checksum, the shortest frame that can be validated.
pub const MIN_FRAME_LEN: usize = 5;

/// Header, serial number and address of a device-found reply, checksum excluded.
pub const DEVICE_RECORD_LEN: usize = 8;

/// Classification of a reply that passed validation.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Response {
    /// Nothing was received. The bus has no more devices to offer.
    ScanComplete,
    /// The bus explicitly signalled the end of the scan.
    ScanEnded,
    /// A device won the arbitration and sent its identity.
    DeviceFound(DeviceRecord),
}

impl Response {
    /// True if the current session is over.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::DeviceFound(_))
    }
}

/// Build a command frame. The checksum is computed here and can't be supplied.
///
/// ```
/// use extscan_proto::frame::build_command;
/// use extscan_proto::Subcommand;
///
/// let frame = build_command(0xFD, 0x46, Subcommand::ContinueScan);
/// assert_eq!(frame, [0xFD, 0x46, 0x02, 0x53, 0x91]);
/// ```
pub fn build_command(address: u8, function_code: u8, subcommand: Subcommand) -> [u8; COMMAND_LEN] {
    let header = [address, function_code, subcommand.to_byte()];
    let [lo, hi] = checksum(&header).to_le_bytes();
    [header[0], header[1], header[2], lo, hi]
}

/// Broadcast scan command with the given subcommand.
pub fn scan_command(subcommand: Subcommand) -> [u8; COMMAND_LEN] {
    build_command(BROADCAST_ADDRESS, EXTENDED_FUNCTION_CODE, subcommand)
}

/// Drop all idle-fill bytes, keeping the order of the rest.
pub fn denoise(raw: &[u8]) -> Vec<u8> {
    raw.iter().copied().filter(|b| *b != IDLE_FILL).collect()
}

/// Validate a reply and classify it.
///
/// # Errors
/// - [`Error::MalformedFrame`] if fewer than five bytes remain after [`denoise`].
/// - [`Error::ChecksumMismatch`] if the trailing checksum is wrong.
/// - [`Error::UnrecognizedFrame`] for a foreign header or subcommand.
/// - [`Error::MalformedDeviceRecord`] for a device-found reply of the wrong length.
pub fn parse_response(raw: &[u8]) -> Result<Response, Error> {
    if raw.is_empty() {
        return Ok(Response::ScanComplete);
    }

    let frame = denoise(raw);
    let len = frame.len();
    ensure!(len >= MIN_FRAME_LEN, MalformedFrameSnafu { len });
    let (_, fields) = nom_parser::raw_frame(&frame)
        .ok()
        .context(MalformedFrameSnafu { len })?;

    let body = &frame[..len - 2];
    let computed = checksum(body);
    ensure!(
        computed == fields.declared_checksum,
        ChecksumMismatchSnafu {
            declared: fields.declared_checksum,
            computed,
            payload: body.to_vec(),
        }
    );

    let header = fields.header;
    ensure!(
        header[0] == BROADCAST_ADDRESS && header[1] == EXTENDED_FUNCTION_CODE,
        UnrecognizedFrameSnafu { header }
    );

    match Subcommand::from_byte(header[2]) {
        Some(Subcommand::EndScan) => Ok(Response::ScanEnded),
        Some(Subcommand::DeviceFound) => {
            ensure!(
                body.len() == DEVICE_RECORD_LEN,
                MalformedDeviceRecordSnafu { len: body.len() }
            );
            let (_, record) = nom_parser::device_record(fields.payload)
                .ok()
                .context(MalformedDeviceRecordSnafu { len: body.len() })?;
            Ok(Response::DeviceFound(record))
        }
        _ => UnrecognizedFrameSnafu { header }.fail(),
    }
}
