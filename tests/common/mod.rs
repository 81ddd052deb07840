#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{Error as IoError, ErrorKind};
use std::rc::Rc;
use std::time::Duration;

use extscan_proto::crc::checksum;
use extscan_proto::frame::scan_command;
use extscan_proto::scanner::io::ScanConfig;
use extscan_proto::transport::{Connector, Transport};
use extscan_proto::{Error, Subcommand};

/// A device on the simulated bus.
#[derive(Debug, Clone, Copy)]
pub struct SimDevice {
    pub serial: u32,
    pub address: u8,
    pub baud_rate: u32,
}

/// Half-duplex bus with a set of devices, each listening at one baud rate.
///
/// Devices that haven't been enumerated since the last start-scan take part
/// in the arbitration, and the lowest serial number wins.
#[derive(Default)]
pub struct SimBus {
    devices: Vec<SimDevice>,
    enumerated: Vec<u32>,
    unavailable: Vec<u32>,
    scripted: HashMap<u32, VecDeque<Vec<u8>>>,
    write_error_at: Option<u32>,
    end_marker: bool,
    noise: bool,
    read_chunk: Option<usize>,
    pub opened: Vec<u32>,
    pub closed: Vec<u32>,
    pub tx: Vec<(u32, Vec<u8>)>,
}

impl SimBus {
    pub fn new() -> Rc<RefCell<SimBus>> {
        Rc::new(RefCell::new(SimBus::default()))
    }

    pub fn add_device(&mut self, serial: u32, address: u8, baud_rate: u32) {
        self.devices.push(SimDevice {
            serial,
            address,
            baud_rate,
        });
    }

    /// Opening the port at `baud_rate` fails.
    pub fn make_unavailable(&mut self, baud_rate: u32) {
        self.unavailable.push(baud_rate);
    }

    /// Reply with `raw` to the next command sent at `baud_rate`, instead of
    /// what the devices would answer.
    pub fn script_reply(&mut self, baud_rate: u32, raw: Vec<u8>) {
        self.scripted.entry(baud_rate).or_default().push_back(raw);
    }

    /// The next write at `baud_rate` fails.
    pub fn trigger_write_error(&mut self, baud_rate: u32) {
        self.write_error_at = Some(baud_rate);
    }

    /// Finish scans with an end-scan frame instead of silence.
    pub fn send_end_marker(&mut self, enabled: bool) {
        self.end_marker = enabled;
    }

    /// Surround every reply with idle-fill bytes.
    pub fn add_line_noise(&mut self, enabled: bool) {
        self.noise = enabled;
    }

    /// The port reports and hands out at most `len` received bytes at a time,
    /// like a driver with a small input queue.
    pub fn limit_reads(&mut self, len: usize) {
        self.read_chunk = Some(len);
    }

    /// Subcommands sent at `baud_rate`, in order.
    pub fn subcommands_at(&self, baud_rate: u32) -> Vec<u8> {
        self.tx
            .iter()
            .filter(|(rate, _)| *rate == baud_rate)
            .map(|(_, frame)| frame[2])
            .collect()
    }

    fn reply(&mut self, baud_rate: u32, command: &[u8]) -> Vec<u8> {
        if let Some(raw) = self.scripted.get_mut(&baud_rate).and_then(VecDeque::pop_front) {
            return raw;
        }

        if command == scan_command(Subcommand::StartScan) {
            let devices = &self.devices;
            self.enumerated.retain(|serial| {
                !devices
                    .iter()
                    .any(|d| d.serial == *serial && d.baud_rate == baud_rate)
            });
        } else if command != scan_command(Subcommand::ContinueScan) {
            return Vec::new();
        }

        let enumerated = &self.enumerated;
        let winner = self
            .devices
            .iter()
            .filter(|d| d.baud_rate == baud_rate && !enumerated.contains(&d.serial))
            .min_by_key(|d| d.serial)
            .copied();

        let reply = match winner {
            Some(device) => {
                self.enumerated.push(device.serial);
                device_frame(device.serial, device.address)
            }
            None if self.end_marker => scan_command(Subcommand::EndScan).to_vec(),
            None => Vec::new(),
        };
        if self.noise && !reply.is_empty() {
            let mut noisy = vec![0xFF, 0xFF];
            noisy.extend(reply);
            noisy.push(0xFF);
            noisy
        } else {
            reply
        }
    }
}

/// A device-found reply with a valid checksum.
pub fn device_frame(serial: u32, address: u8) -> Vec<u8> {
    let mut frame = vec![0xFD, 0x46, 0x03];
    frame.extend_from_slice(&serial.to_be_bytes());
    frame.push(address);
    frame.extend_from_slice(&checksum(&frame).to_le_bytes());
    frame
}

/// Config for the simulated bus, without the settle delay.
pub fn sim_config() -> ScanConfig {
    let mut config = ScanConfig::new("sim0");
    config.settle = Duration::ZERO;
    config
}

pub struct SimConnector(pub Rc<RefCell<SimBus>>);

impl SimConnector {
    pub fn new(bus: &Rc<RefCell<SimBus>>) -> SimConnector {
        SimConnector(Rc::clone(bus))
    }
}

impl Connector for SimConnector {
    type Port = SimPort;

    fn open(&mut self, baud_rate: u32) -> Result<SimPort, Error> {
        let mut bus = self.0.borrow_mut();
        if bus.unavailable.contains(&baud_rate) {
            return Err(Error::TransportOpen {
                port: "sim0".to_string(),
                baud_rate,
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "port busy"),
            });
        }
        bus.opened.push(baud_rate);
        Ok(SimPort {
            bus: Rc::clone(&self.0),
            baud_rate,
            rx: VecDeque::new(),
        })
    }

    fn port_name(&self) -> &str {
        "sim0"
    }
}

pub struct SimPort {
    bus: Rc<RefCell<SimBus>>,
    baud_rate: u32,
    rx: VecDeque<u8>,
}

impl SimPort {
    fn chunk(&self, len: usize) -> usize {
        match self.bus.borrow().read_chunk {
            Some(limit) => len.min(limit),
            None => len,
        }
    }

    /// Bytes received but not read yet.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for SimPort {
    fn write_all(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut bus = self.bus.borrow_mut();
        if bus.write_error_at == Some(self.baud_rate) {
            bus.write_error_at = None;
            return Err(Error::TransportIo {
                source: IoError::new(ErrorKind::BrokenPipe, "device unplugged"),
            });
        }
        bus.tx.push((self.baud_rate, data.to_vec()));
        let reply = bus.reply(self.baud_rate, data);
        self.rx.extend(reply);
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, Error> {
        Ok(self.chunk(self.rx.len()))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let len = self.chunk(buf.len().min(self.rx.len()));
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..len)) {
            *dst = src;
        }
        Ok(len)
    }
}

impl Drop for SimPort {
    fn drop(&mut self) {
        self.bus.borrow_mut().closed.push(self.baud_rate);
    }
}
