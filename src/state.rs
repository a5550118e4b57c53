use crate::common::{Level, Mode, PinIndex, PinMap, PortIndex, Pull, PINS_PER_PORT, PORT_COUNT};

/// Electrical configuration of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortConfig {
    pub mode: Mode,
    pub pull: Pull,
    /// Union of the physical pins belonging to this port.
    pub pin_mask: u32,
}

impl PortConfig {
    /// Default configuration: floating-safe input with pull-down.
    pub fn default_for(pin_mask: u32) -> Self {
        Self {
            mode: Mode::Input,
            pull: Pull::PullDown,
            pin_mask,
        }
    }

    /// Whether mode or pull differ.  The pin mask is fixed per port and not compared.
    pub fn io_differs(&self, other: &PortConfig) -> bool {
        self.mode != other.mode || self.pull != other.pull
    }
}

/// Per-port runtime state.
///
/// `changed_io` and `changed_pin` are only meaningful between staging and committing a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortRuntime {
    pub config: PortConfig,
    pub pins: [Level; PINS_PER_PORT],
    pub changed_io: bool,
    pub changed_pin: bool,
}

impl PortRuntime {
    pub fn default_for(pin_mask: u32) -> Self {
        Self {
            config: PortConfig::default_for(pin_mask),
            pins: [Level::Low; PINS_PER_PORT],
            changed_io: false,
            changed_pin: false,
        }
    }

    /// Revert to the default configuration, keeping the port's pin mask.
    pub fn revert_to_default(&mut self) {
        *self = Self::default_for(self.config.pin_mask);
    }

    pub fn pin(&self, pin: PinIndex) -> Level {
        self.pins[pin.get()]
    }

    /// Pin levels as a bit field, pin `i` in bit `i`.
    pub fn pin_bits(&self) -> u8 {
        PinIndex::all()
            .filter(|&pin| self.pin(pin).is_high())
            .fold(0, |bits, pin| bits | (1 << pin.get()))
    }
}

/// Ordered state of all ports.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DigitalState {
    ports: [PortRuntime; PORT_COUNT],
}

impl DigitalState {
    /// All ports in their default configuration, pin masks taken from `pin_map`.
    pub fn new(pin_map: &PinMap) -> Self {
        let mut ports = [PortRuntime::default_for(0); PORT_COUNT];
        for port in PortIndex::all() {
            ports[port.get()] = PortRuntime::default_for(pin_map.port_mask(port));
        }
        Self { ports }
    }

    pub fn port(&self, port: PortIndex) -> &PortRuntime {
        &self.ports[port.get()]
    }

    pub fn port_mut(&mut self, port: PortIndex) -> &mut PortRuntime {
        &mut self.ports[port.get()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PortIndex, &PortRuntime)> {
        PortIndex::all().zip(self.ports.iter())
    }

    pub(crate) fn clear_change_flags(&mut self) {
        for port in self.ports.iter_mut() {
            port.changed_io = false;
            port.changed_pin = false;
        }
    }

    /// The part of the state visible in a status report.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for (port, runtime) in self.iter() {
            snapshot.modes[port.get()] = runtime.config.mode;
            snapshot.pins[port.get()] = runtime.pins;
        }
        snapshot
    }
}

/// Mode and pin-level projection of a [`DigitalState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot {
    pub modes: [Mode; PORT_COUNT],
    pub pins: [[Level; PINS_PER_PORT]; PORT_COUNT],
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            modes: [Mode::Input; PORT_COUNT],
            pins: [[Level::Low; PINS_PER_PORT]; PORT_COUNT],
        }
    }
}
