//! [`GpioBackend`](crate::GpioBackend) on two `PCAL6416A` "16-bit I2C-bus and SMBus I/O port
//! with interrupt" expanders.
//!
//! Both chips share one bus, the one with ADDR low (`0x20`) provides physical pins `0..16`, the
//! one with ADDR high (`0x21`) provides pins `16..32`.  Within a chip, pins `0..8` are in bank 0
//! and pins `8..16` in bank 1.
use crate::bus::I2cExt;
use crate::{Level, Mode, PinId, PinIndex, PinMap, PortConfig, PortIndex, Pull};
use embedded_hal::i2c::I2c;

const ADDRESSES: [u8; 2] = [0x20, 0x21];

/// Register of bank 0; the bank 1 register directly follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regs {
    InputPort0 = 0x00,
    OutputPort0 = 0x02,
    Configuration0 = 0x06,
    PullEnable0 = 0x46,
    PullSelection0 = 0x48,
}

impl Regs {
    fn bank(self, bank: u8) -> u8 {
        self as u8 + bank
    }
}

/// Location of a physical pin on the expanders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bank {
    addr: u8,
    bank: u8,
}

impl Bank {
    fn of(id: PinId) -> (Self, u8) {
        let id = id.get();
        let bank = Self {
            addr: ADDRESSES[usize::from(id / 16)],
            bank: (id % 16) / 8,
        };
        (bank, 1 << (id % 8))
    }

    /// Banks touched by a 32-bit pin mask, with their part of the mask.
    fn split(mask: u32) -> impl Iterator<Item = (Self, u8)> {
        (0..4u8).filter_map(move |n| {
            let bits = (mask >> (8 * n)) as u8;
            (bits != 0).then_some((
                Self {
                    addr: ADDRESSES[usize::from(n / 2)],
                    bank: n % 2,
                },
                bits,
            ))
        })
    }
}

/// Two `PCAL6416A` expanders driven as one backend.
pub struct Pcal6416a<I2C> {
    i2c: I2C,
    pin_map: PinMap,
}

impl<I2C> Pcal6416a<I2C> {
    /// Backend with [`PinMap::linear()`]: port `p` on pins `4p..4p+4`.
    pub fn new(i2c: I2C) -> Self {
        Self::with_pin_map(i2c, PinMap::linear())
    }

    pub fn with_pin_map(i2c: I2C, pin_map: PinMap) -> Self {
        Self { i2c, pin_map }
    }

    /// Give back the bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> Pcal6416a<I2C> {
    fn set_direction(&mut self, bank: Bank, bits: u8, mode: Mode) -> Result<(), I2C::Error> {
        // Configuration bit set means input.
        let (mask_set, mask_clear) = match mode {
            Mode::Input => (bits, 0),
            Mode::Output => (0, bits),
        };
        self.i2c.update_reg(
            bank.addr,
            Regs::Configuration0.bank(bank.bank),
            mask_set,
            mask_clear,
        )
    }

    fn set_pull(&mut self, bank: Bank, bits: u8, pull: Pull) -> Result<(), I2C::Error> {
        let enable = Regs::PullEnable0.bank(bank.bank);
        let select = Regs::PullSelection0.bank(bank.bank);
        match pull {
            Pull::NoPull => self.i2c.update_reg(bank.addr, enable, 0, bits),
            // select before enabling to avoid pulling the wrong way for a moment
            Pull::PullUp => {
                self.i2c.update_reg(bank.addr, select, bits, 0)?;
                self.i2c.update_reg(bank.addr, enable, bits, 0)
            }
            Pull::PullDown => {
                self.i2c.update_reg(bank.addr, select, 0, bits)?;
                self.i2c.update_reg(bank.addr, enable, bits, 0)
            }
        }
    }
}

impl<I2C: I2c> crate::GpioBackend for Pcal6416a<I2C> {
    type Error = I2C::Error;

    fn pin_map(&self) -> &PinMap {
        &self.pin_map
    }

    fn configure_port(&mut self, _port: PortIndex, config: &PortConfig) -> Result<(), Self::Error> {
        for (bank, bits) in Bank::split(config.pin_mask) {
            match config.mode {
                // stop driving first, then adjust the pulls
                Mode::Input => {
                    self.set_direction(bank, bits, Mode::Input)?;
                    self.set_pull(bank, bits, config.pull)?;
                }
                Mode::Output => {
                    self.set_pull(bank, bits, config.pull)?;
                    self.set_direction(bank, bits, Mode::Output)?;
                }
            }
        }
        Ok(())
    }

    fn write_pin(&mut self, port: PortIndex, pin: PinIndex, level: Level) -> Result<(), Self::Error> {
        let (bank, bit) = Bank::of(self.pin_map.pin_id(port, pin));
        let (mask_set, mask_clear) = match level {
            Level::High => (bit, 0),
            Level::Low => (0, bit),
        };
        self.i2c.update_reg(
            bank.addr,
            Regs::OutputPort0.bank(bank.bank),
            mask_set,
            mask_clear,
        )
    }

    fn read_pin(&mut self, port: PortIndex, pin: PinIndex) -> Result<Level, Self::Error> {
        let (bank, bit) = Bank::of(self.pin_map.pin_id(port, pin));
        let input = self
            .i2c
            .read_reg(bank.addr, Regs::InputPort0.bank(bank.bank))?;
        Ok(Level::from(input & bit != 0))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Engine, EngineConfig, Error, GpioBackend, Phase, PortIndex, PortConfig};
    use crate::{Level, Mode, PinIndex, Pull};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    fn port(i: usize) -> PortIndex {
        PortIndex::new(i).unwrap()
    }

    fn pin(i: usize) -> PinIndex {
        PinIndex::new(i).unwrap()
    }

    #[test]
    fn pcal6416a_backend() {
        let expectations = [
            // port 0 output with pull-up
            mock_i2c::Transaction::write_read(0x20, vec![0x48], vec![0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x48, 0x0f]),
            mock_i2c::Transaction::write_read(0x20, vec![0x46], vec![0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x46, 0x0f]),
            mock_i2c::Transaction::write_read(0x20, vec![0x06], vec![0xff]),
            mock_i2c::Transaction::write(0x20, vec![0x06, 0xf0]),
            // port 5 input without pull
            mock_i2c::Transaction::write_read(0x21, vec![0x06], vec![0x0f]),
            mock_i2c::Transaction::write(0x21, vec![0x06, 0xff]),
            mock_i2c::Transaction::write_read(0x21, vec![0x46], vec![0xff]),
            mock_i2c::Transaction::write(0x21, vec![0x46, 0x0f]),
            // port 3 input with pull-down
            mock_i2c::Transaction::write_read(0x20, vec![0x07], vec![0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x07, 0xf0]),
            mock_i2c::Transaction::write_read(0x20, vec![0x49], vec![0xff]),
            mock_i2c::Transaction::write(0x20, vec![0x49, 0x0f]),
            mock_i2c::Transaction::write_read(0x20, vec![0x47], vec![0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x47, 0xf0]),
            // port 2 pin 1 high
            mock_i2c::Transaction::write_read(0x20, vec![0x03], vec![0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x03, 0x02]),
            // port 4 pin 0 low
            mock_i2c::Transaction::write_read(0x21, vec![0x02], vec![0xff]),
            mock_i2c::Transaction::write(0x21, vec![0x02, 0xfe]),
            // port 3 pin 3, port 5 pin 0
            mock_i2c::Transaction::write_read(0x20, vec![0x01], vec![0x80]),
            mock_i2c::Transaction::write_read(0x21, vec![0x00], vec![0xef]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut pcal = super::Pcal6416a::new(bus.clone());
        let map = pcal.pin_map().clone();
        let config = |p: usize, mode, pull| PortConfig {
            mode,
            pull,
            pin_mask: map.port_mask(port(p)),
        };

        pcal.configure_port(port(0), &config(0, Mode::Output, Pull::PullUp))
            .unwrap();
        pcal.configure_port(port(5), &config(5, Mode::Input, Pull::NoPull))
            .unwrap();
        pcal.configure_port(port(3), &config(3, Mode::Input, Pull::PullDown))
            .unwrap();

        pcal.write_pin(port(2), pin(1), Level::High).unwrap();
        pcal.write_pin(port(4), pin(0), Level::Low).unwrap();

        assert_eq!(pcal.read_pin(port(3), pin(3)).unwrap(), Level::High);
        assert_eq!(pcal.read_pin(port(5), pin(0)).unwrap(), Level::Low);

        bus.done();
    }

    #[test]
    fn engine_on_pcal6416a() {
        let expectations = [
            // drive phase: port 0 output, no pull
            mock_i2c::Transaction::write_read(0x20, vec![0x46], vec![0x0f]),
            mock_i2c::Transaction::write(0x20, vec![0x46, 0x00]),
            mock_i2c::Transaction::write_read(0x20, vec![0x06], vec![0xff]),
            mock_i2c::Transaction::write(0x20, vec![0x06, 0xf0]),
            // pin writes 0001
            mock_i2c::Transaction::write_read(0x20, vec![0x02], vec![0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x02, 0x01]),
            mock_i2c::Transaction::write_read(0x20, vec![0x02], vec![0x01]),
            mock_i2c::Transaction::write(0x20, vec![0x02, 0x01]),
            mock_i2c::Transaction::write_read(0x20, vec![0x02], vec![0x01]),
            mock_i2c::Transaction::write(0x20, vec![0x02, 0x01]),
            mock_i2c::Transaction::write_read(0x20, vec![0x02], vec![0x01]),
            mock_i2c::Transaction::write(0x20, vec![0x02, 0x01]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut engine = Engine::new(super::Pcal6416a::new(bus.clone()), EngineConfig::new());
        engine.process(&[0x13, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(engine.report().as_bytes(), &[0x01, 0x01, 0x00, 0x00]);

        // nothing changed, no bus traffic
        engine.process(&[0x13, 0, 0, 0, 0, 0]).unwrap();

        bus.done();
    }

    #[test]
    fn bus_error_is_a_hardware_fault() {
        let expectations = [
            mock_i2c::Transaction::write_read(0x20, vec![0x46], vec![0x0f])
                .with_error(ErrorKind::Other),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut engine = Engine::new(super::Pcal6416a::new(bus.clone()), EngineConfig::new());
        let err = engine.process(&[0x13, 0, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            Error::HardwareFault {
                phase: Phase::Drive,
                source: ErrorKind::Other
            }
        );
        assert_eq!(engine.report().as_bytes(), &[0x00, 0x00, 0x00, 0x00]);

        bus.done();
    }
}
