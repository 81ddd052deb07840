use nom::bytes::complete::take;
use nom::combinator::{all_consuming, map};
use nom::number::complete::{be_u32, le_u16, u8};
use nom::sequence::tuple;
use nom::IResult;

use crate::types::{BusAddress, DeviceRecord, SerialNumber};

type Buf = [u8];

/// A frame split into its fields. Nothing has been checked yet.
#[derive(PartialEq, Debug)]
pub(crate) struct RawFrame<'a> {
    pub header: [u8; 3],
    pub payload: &'a Buf,
    pub declared_checksum: u16,
}

/// Header, payload and checksum of a complete frame.
/// The payload is whatever sits between the header and the last two bytes.
pub(crate) fn raw_frame(buf: &Buf) -> IResult<&Buf, RawFrame<'_>> {
    let payload_len = buf.len().saturating_sub(5);
    all_consuming(map(
        tuple((u8, u8, u8, take(payload_len), le_u16)),
        |(address, function, subcommand, payload, declared_checksum)| RawFrame {
            header: [address, function, subcommand],
            payload,
            declared_checksum,
        },
    ))(buf)
}

/// Serial number (big-endian) followed by the bus address.
pub(crate) fn device_record(buf: &Buf) -> IResult<&Buf, DeviceRecord> {
    all_consuming(map(tuple((be_u32, u8)), |(serial, address)| DeviceRecord {
        serial_number: SerialNumber::new(serial),
        bus_address: BusAddress::new(address),
    }))(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_frame() {
        let buf = [0xFD, 0x46, 0x03, 0xAA, 0xBB, 0x34, 0x12];
        let (rest, frame) = raw_frame(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(frame.header, [0xFD, 0x46, 0x03]);
        assert_eq!(frame.payload, &[0xAA, 0xBB]);
        assert_eq!(frame.declared_checksum, 0x1234);
    }

    #[test]
    fn test_raw_frame_without_payload() {
        let (_, frame) = raw_frame(&[0xFD, 0x46, 0x04, 0xD3, 0x93]).unwrap();
        assert!(frame.payload.is_empty());
        assert_eq!(frame.declared_checksum, 0x93D3);

        assert!(raw_frame(&[0xFD, 0x46, 0x04, 0xD3]).is_err());
    }

    #[test]
    fn test_device_record() {
        let (_, record) = device_record(&[0x00, 0x00, 0x01, 0x2C, 0x05]).unwrap();
        assert_eq!(record.serial_number, 300);
        assert_eq!(record.bus_address, 5);

        assert!(device_record(&[0x00, 0x00, 0x01, 0x2C]).is_err());
        assert!(device_record(&[0x00, 0x00, 0x01, 0x2C, 0x05, 0x06]).is_err());
    }
}
