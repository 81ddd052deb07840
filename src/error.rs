use snafu::Snafu;

/// Everything that can go wrong during a scan.
///
/// Only [`Error::TransportOpen`] and [`Error::TransportIo`] end a session early.
/// The frame errors are absorbed by the scan loop, which reports them and keeps
/// going.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    /// The serial port could not be opened at this baud rate.
    #[snafu(display("Failed to open {} at {} baud: {}", port, baud_rate, source))]
    TransportOpen {
        port: String,
        baud_rate: u32,
        source: serialport::Error,
    },
    /// Writing to or reading from an open port failed.
    #[snafu(display("Serial I/O failed: {}", source))]
    TransportIo { source: std::io::Error },
    /// Less than the five bytes needed for a header and a checksum.
    #[snafu(display("Frame too short: {} bytes", len))]
    MalformedFrame { len: usize },
    /// The checksum at the end of the frame doesn't match its contents.
    #[snafu(display(
        "Checksum mismatch: declared {:#06x}, computed {:#06x}",
        declared,
        computed
    ))]
    ChecksumMismatch {
        declared: u16,
        computed: u16,
        /// The received bytes, without the checksum.
        payload: Vec<u8>,
    },
    /// Valid checksum, but not a scan reply.
    #[snafu(display("Unrecognized frame header {:02X?}", header))]
    UnrecognizedFrame { header: [u8; 3] },
    /// A device-found reply of the wrong length.
    #[snafu(display("Device record has {} bytes, expected 8", len))]
    MalformedDeviceRecord { len: usize },
}
