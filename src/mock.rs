//! Recording backend for unit tests.
use crate::common::{GpioBackend, Level, Mode, PinIndex, PinMap, PortIndex, Pull};
use crate::common::{PINS_PER_PORT, PORT_COUNT};
use crate::state::PortConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Configure(usize, Mode, Pull),
    Write(usize, usize, Level),
    Read(usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault;

pub struct RecordingBackend {
    pub pin_map: PinMap,
    pub calls: Vec<Call>,
    /// Levels returned by `read_pin`.
    pub inputs: [[Level; PINS_PER_PORT]; PORT_COUNT],
    /// Zero-based number of the call which fails.
    pub fail_at: Option<usize>,
    attempts: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            pin_map: PinMap::linear(),
            calls: Vec::new(),
            inputs: [[Level::Low; PINS_PER_PORT]; PORT_COUNT],
            fail_at: None,
            attempts: 0,
        }
    }

    /// Fail the `n`-th call from now on.
    pub fn fail_after(&mut self, n: usize) {
        self.fail_at = Some(self.attempts + n);
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        core::mem::take(&mut self.calls)
    }

    pub fn configures(&self) -> Vec<(usize, Mode)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                Call::Configure(port, mode, _) => Some((port, mode)),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<(usize, usize, Level)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                Call::Write(port, pin, level) => Some((port, pin, level)),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: Call) -> Result<(), Fault> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_at == Some(attempt) {
            return Err(Fault);
        }
        self.calls.push(call);
        Ok(())
    }
}

impl GpioBackend for RecordingBackend {
    type Error = Fault;

    fn pin_map(&self) -> &PinMap {
        &self.pin_map
    }

    fn configure_port(&mut self, port: PortIndex, config: &PortConfig) -> Result<(), Fault> {
        assert_eq!(config.pin_mask, self.pin_map.port_mask(port));
        self.record(Call::Configure(port.get(), config.mode, config.pull))
    }

    fn write_pin(&mut self, port: PortIndex, pin: PinIndex, level: Level) -> Result<(), Fault> {
        self.record(Call::Write(port.get(), pin.get(), level))
    }

    fn read_pin(&mut self, port: PortIndex, pin: PinIndex) -> Result<Level, Fault> {
        self.record(Call::Read(port.get(), pin.get()))?;
        Ok(self.inputs[port.get()][pin.get()])
    }
}
