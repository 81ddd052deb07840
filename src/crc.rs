//! CRC16/MODBUS, computed bit by bit.

const POLY: u16 = 0xA001;

/// Checksum of `data`, as appended (little-endian) to every frame on the bus.
///
/// Empty input returns the initial value `0xFFFF`.
pub fn checksum(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= u16::from(*byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}
