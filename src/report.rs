//! Status report sent back to the host.
//!
//! The report is four bytes long:
//!
//! | Byte | Bits | Content |
//! | ---- | ---- | ------- |
//! | 0    | 0..6 | mode of port `n` in bit `n` (`1` = output), bits 6 and 7 reserved as zero |
//! | 1    | 0..4 | pin levels of port 0 |
//! | 1    | 4..8 | pin levels of port 1 |
//! | 2    | 0..4 / 4..8 | ports 2 / 3 |
//! | 3    | 0..4 / 4..8 | ports 4 / 5 |
use crate::common::{Level, Mode, PinIndex, PortIndex, PINS_PER_PORT, PORT_COUNT};
use crate::state::{DigitalState, Snapshot};

/// Length of a status report in bytes.
pub const REPORT_LEN: usize = 1 + PORT_COUNT / 2;

const MODE_BYTE: usize = 0;
const PINS_OFFSET: usize = 1;
const NIBBLE_MASK: u8 = 0x0f;

/// Encoded status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Report([u8; REPORT_LEN]);

impl Report {
    pub const fn from_bytes(bytes: [u8; REPORT_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }

    pub fn encode(state: &DigitalState) -> Self {
        let mut report = Self::default();
        for (port, runtime) in state.iter() {
            report.set_mode(port, runtime.config.mode);
            report.set_pin_bits(port, runtime.pin_bits());
        }
        report
    }

    /// Recover the mode and pin projection.  Reserved bits are ignored.
    pub fn decode(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for port in PortIndex::all() {
            snapshot.modes[port.get()] = self.mode(port);
            let bits = self.pin_bits(port);
            for pin in PinIndex::all() {
                snapshot.pins[port.get()][pin.get()] = Level::from(bits & (1 << pin.get()) != 0);
            }
        }
        snapshot
    }

    pub fn mode(&self, port: PortIndex) -> Mode {
        if self.0[MODE_BYTE] & (1 << port.get()) != 0 {
            Mode::Output
        } else {
            Mode::Input
        }
    }

    /// Pin levels of `port`, pin `n` in bit `n`.
    pub fn pin_bits(&self, port: PortIndex) -> u8 {
        let (byte, shift) = Self::nibble(port);
        (self.0[byte] >> shift) & NIBBLE_MASK
    }

    fn set_mode(&mut self, port: PortIndex, mode: Mode) {
        if mode.is_driving() {
            self.0[MODE_BYTE] |= 1 << port.get();
        }
    }

    fn set_pin_bits(&mut self, port: PortIndex, bits: u8) {
        let (byte, shift) = Self::nibble(port);
        self.0[byte] |= (bits & NIBBLE_MASK) << shift;
    }

    /// Even ports use the low nibble, odd ports the high nibble.
    fn nibble(port: PortIndex) -> (usize, u8) {
        let byte = PINS_OFFSET + port.get() / 2;
        let shift = (port.get() % 2) as u8 * PINS_PER_PORT as u8;
        (byte, shift)
    }
}

impl From<Report> for [u8; REPORT_LEN] {
    fn from(report: Report) -> Self {
        report.0
    }
}

impl AsRef<[u8]> for Report {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
