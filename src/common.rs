/// Number of logical ports managed by one engine.
pub const PORT_COUNT: usize = 6;

/// Number of pins grouped into each port.
pub const PINS_PER_PORT: usize = 4;

/// Hardware capability the engine drives.
///
/// Implementations program the actual GPIO hardware.  All calls are expected to be synchronous;
/// an implementation that cannot fail should use [`core::convert::Infallible`] as its error.
pub trait GpioBackend {
    type Error;

    /// Static mapping of every port/pin to its physical pin identifier.
    fn pin_map(&self) -> &PinMap;

    /// Program the electrical mode and pull policy of all pins in `config.pin_mask`.
    ///
    /// This must be idempotent: calling it twice with the same configuration leaves the hardware
    /// in the same state as calling it once.
    fn configure_port(&mut self, port: PortIndex, config: &crate::PortConfig)
        -> Result<(), Self::Error>;

    /// Drive a single pin to `level`.
    fn write_pin(&mut self, port: PortIndex, pin: PinIndex, level: Level)
        -> Result<(), Self::Error>;

    /// Sample the instantaneous level of a single pin.
    fn read_pin(&mut self, port: PortIndex, pin: PinIndex) -> Result<Level, Self::Error>;
}

/// Electrical direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Input,
    Output,
}

impl Mode {
    /// Whether a port in this mode actively drives its pins.
    pub fn is_driving(self) -> bool {
        self == Mode::Output
    }
}

/// Pull resistor policy of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    NoPull,
    PullUp,
    PullDown,
}

/// Logic level of a single pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> bool {
        level.is_high()
    }
}

impl From<embedded_hal::digital::PinState> for Level {
    fn from(state: embedded_hal::digital::PinState) -> Self {
        match state {
            embedded_hal::digital::PinState::Low => Level::Low,
            embedded_hal::digital::PinState::High => Level::High,
        }
    }
}

impl From<Level> for embedded_hal::digital::PinState {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => embedded_hal::digital::PinState::Low,
            Level::High => embedded_hal::digital::PinState::High,
        }
    }
}

/// Index of a port, guaranteed to be below [`PORT_COUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortIndex(u8);

impl PortIndex {
    /// Returns `None` for indices outside of `0..PORT_COUNT`.
    pub const fn new(index: usize) -> Option<Self> {
        if index < PORT_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// All ports in ascending order.
    pub fn all() -> impl Iterator<Item = PortIndex> + Clone {
        (0..PORT_COUNT as u8).map(PortIndex)
    }
}

/// Index of a pin within its port, guaranteed to be below [`PINS_PER_PORT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinIndex(u8);

impl PinIndex {
    /// Returns `None` for indices outside of `0..PINS_PER_PORT`.
    pub const fn new(index: usize) -> Option<Self> {
        if index < PINS_PER_PORT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// All pins of a port in ascending order.
    pub fn all() -> impl Iterator<Item = PinIndex> + Clone {
        (0..PINS_PER_PORT as u8).map(PinIndex)
    }
}

/// Physical pin identifier in `0..32`, as used in 32-bit pin masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(u8);

impl PinId {
    pub const fn new(id: u8) -> Option<Self> {
        if id < 32 {
            Some(Self(id))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn mask(self) -> u32 {
        1 << self.0
    }
}

/// Build-time assignment of every port/pin to a physical pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMap {
    ids: [[PinId; PINS_PER_PORT]; PORT_COUNT],
}

impl PinMap {
    /// Creates a pin map from raw identifiers.
    ///
    /// Returns `None` if any identifier is out of range or assigned twice.
    pub const fn new(raw: [[u8; PINS_PER_PORT]; PORT_COUNT]) -> Option<Self> {
        let mut ids = [[PinId(0); PINS_PER_PORT]; PORT_COUNT];
        let mut seen: u32 = 0;
        let mut port = 0;
        while port < PORT_COUNT {
            let mut pin = 0;
            while pin < PINS_PER_PORT {
                let id = match PinId::new(raw[port][pin]) {
                    Some(id) => id,
                    None => return None,
                };
                if seen & id.mask() != 0 {
                    return None;
                }
                seen |= id.mask();
                ids[port][pin] = id;
                pin += 1;
            }
            port += 1;
        }
        Some(Self { ids })
    }

    /// Port `p`, pin `i` maps to physical pin `PINS_PER_PORT * p + i`.
    pub const fn linear() -> Self {
        let mut ids = [[PinId(0); PINS_PER_PORT]; PORT_COUNT];
        let mut port = 0;
        while port < PORT_COUNT {
            let mut pin = 0;
            while pin < PINS_PER_PORT {
                ids[port][pin] = PinId((port * PINS_PER_PORT + pin) as u8);
                pin += 1;
            }
            port += 1;
        }
        Self { ids }
    }

    pub fn pin_id(&self, port: PortIndex, pin: PinIndex) -> PinId {
        self.ids[port.get()][pin.get()]
    }

    /// Union of the physical pins assigned to `port`.
    pub fn port_mask(&self, port: PortIndex) -> u32 {
        self.ids[port.get()]
            .iter()
            .fold(0, |mask, id| mask | id.mask())
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self::linear()
    }
}
