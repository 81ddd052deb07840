//! Typed values carried in scan frames.

use core::fmt;
use core::ops::Deref;

/// Value of the subcommand byte, offset 2 in every frame.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
#[repr(u8)]
pub enum Subcommand {
    /// Starts a new enumeration round on the bus.
    StartScan = 0x01,
    /// Asks for the next not yet enumerated device.
    ContinueScan = 0x02,
    /// Only seen in replies, carries a device record.
    DeviceFound = 0x03,
    /// Every device has been enumerated.
    EndScan = 0x04,
}

impl Subcommand {
    /// The on-wire byte.
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::StartScan),
            0x02 => Some(Self::ContinueScan),
            0x03 => Some(Self::DeviceFound),
            0x04 => Some(Self::EndScan),
            _ => None,
        }
    }
}

/// Factory serial number of a device, sent big-endian on the wire.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct SerialNumber(u32);

impl SerialNumber {
    pub const fn new(serial: u32) -> Self {
        Self(serial)
    }

    pub const fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }
}

impl Deref for SerialNumber {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<u32> for SerialNumber {
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Address a device has been assigned on the bus.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct BusAddress(u8);

impl BusAddress {
    pub const fn new(address: u8) -> Self {
        Self(address)
    }
}

impl Deref for BusAddress {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<u8> for BusAddress {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identity decoded from a device-found reply.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub struct DeviceRecord {
    pub serial_number: SerialNumber,
    pub bus_address: BusAddress,
}

/// A [`DeviceRecord`] numbered by the reporter, in discovery order.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub struct DiscoveredDevice {
    /// Starts at 1 and counts across all baud rates of a run.
    pub sequence_number: u32,
    pub serial_number: SerialNumber,
    pub bus_address: BusAddress,
}
