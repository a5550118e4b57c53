//! Host command buffer decoding.
//!
//! The command buffer carries one byte per port:
//!
//! | Bits | Field  | Meaning |
//! | ---- | ------ | ------- |
//! | 0    | active | `0` reverts the port to its default configuration |
//! | 1    | mode   | `0` = input, `1` = output |
//! | 2..4 | pull   | `00` = none, `01` = pull-down, `10` = pull-up, `11` = none |
//! | 4..8 | pins   | output level of pin `n` in bit `4 + n` |
//!
//! Independently of the per-port fields, a first byte of exactly [`TRIGGER_SENTINEL`] signals a
//! trigger to the host application.
use crate::common::{Level, Mode, PinIndex, Pull, PINS_PER_PORT};

/// First-byte value which marks a command as a trigger.
pub const TRIGGER_SENTINEL: u8 = 0xfe;

const ACTIVE_BIT: u8 = 0;
const MODE_BIT: u8 = 1;
const PULL_SHIFT: u8 = 2;
const PULL_MASK: u8 = 0b11;
const PINS_SHIFT: u8 = 4;
const PINS_MASK: u8 = 0b1111;

/// Decoded view of a single port byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortCommand(u8);

impl PortCommand {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub fn active(self) -> bool {
        self.0 & (1 << ACTIVE_BIT) != 0
    }

    pub fn mode(self) -> Mode {
        if self.0 & (1 << MODE_BIT) != 0 {
            Mode::Output
        } else {
            Mode::Input
        }
    }

    /// Decoding is total: the reserved pattern `11` falls back to [`Pull::NoPull`].
    pub fn pull(self) -> Pull {
        match (self.0 >> PULL_SHIFT) & PULL_MASK {
            0b01 => Pull::PullDown,
            0b10 => Pull::PullUp,
            _ => Pull::NoPull,
        }
    }

    /// Requested pin levels, pin `n` from bit `4 + n`.
    pub fn pins(self) -> [Level; PINS_PER_PORT] {
        let bits = (self.0 >> PINS_SHIFT) & PINS_MASK;
        let mut pins = [Level::Low; PINS_PER_PORT];
        for pin in PinIndex::all() {
            pins[pin.get()] = Level::from(bits & (1 << pin.get()) != 0);
        }
        pins
    }
}

impl From<u8> for PortCommand {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

/// Out-of-band trigger flag carried by a command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    Triggered,
    #[default]
    DontCare,
}

/// Recognize the trigger sentinel in the first byte of `buffer`.
///
/// An empty buffer never triggers.
pub fn decode_trigger(buffer: &[u8]) -> Trigger {
    match buffer.first() {
        Some(&TRIGGER_SENTINEL) => Trigger::Triggered,
        _ => Trigger::DontCare,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decode_fields() {
        let cmd = PortCommand::new(0b1010_0111);
        assert!(cmd.active());
        assert_eq!(cmd.mode(), Mode::Output);
        assert_eq!(cmd.pull(), Pull::PullDown);
        assert_eq!(
            cmd.pins(),
            [Level::Low, Level::High, Level::Low, Level::High]
        );

        let cmd = PortCommand::new(0b0000_1000);
        assert!(!cmd.active());
        assert_eq!(cmd.mode(), Mode::Input);
        assert_eq!(cmd.pull(), Pull::PullUp);
        assert_eq!(cmd.pins(), [Level::Low; PINS_PER_PORT]);
    }

    #[test]
    fn reserved_pull_is_no_pull() {
        assert_eq!(PortCommand::new(0b0000_1101).pull(), Pull::NoPull);
        assert_eq!(PortCommand::new(0b1111_1111).pull(), Pull::NoPull);
        assert_eq!(PortCommand::new(0b0000_0001).pull(), Pull::NoPull);
    }

    #[test]
    fn trigger_sentinel() {
        assert_eq!(decode_trigger(&[0xfe, 0, 0, 0, 0, 0]), Trigger::Triggered);
        assert_eq!(decode_trigger(&[0xff, 0, 0, 0, 0, 0]), Trigger::DontCare);
        assert_eq!(decode_trigger(&[0x00, 0, 0, 0, 0, 0]), Trigger::DontCare);
        assert_eq!(decode_trigger(&[0xfd]), Trigger::DontCare);
        assert_eq!(decode_trigger(&[]), Trigger::DontCare);
    }

    proptest! {
        #[test]
        fn only_exact_sentinel_triggers(first in any::<u8>(), rest in proptest::collection::vec(any::<u8>(), 0..8)) {
            let mut buffer = vec![first];
            buffer.extend(rest);
            let expected = if first == 0xfe { Trigger::Triggered } else { Trigger::DontCare };
            prop_assert_eq!(decode_trigger(&buffer), expected);
        }

        #[test]
        fn pull_decoding_is_total(raw in any::<u8>()) {
            let expected = match (raw >> 2) & 0b11 {
                0b01 => Pull::PullDown,
                0b10 => Pull::PullUp,
                _ => Pull::NoPull,
            };
            prop_assert_eq!(PortCommand::new(raw).pull(), expected);
        }
    }
}
