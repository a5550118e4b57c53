//! Two-phase ordering of port reconfigurations.
use crate::common::{PortIndex, PORT_COUNT};

/// Commit phase a port is queued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SwitchPhase {
    /// Ports moving to a non-driving mode.
    MakeSafe,
    /// Ports moving to a driving mode.
    Drive,
}

/// Fixed-capacity buffer shared by both phases.
///
/// Make-safe entries fill `slots[..front]` from the start, drive entries fill `slots[back + 1..]`
/// from the end.  Each port is queued at most once per cycle, so the two ranges never meet.
/// Both phases are drained last-queued-first.
#[derive(Debug, Clone)]
pub struct SwitchSequencer {
    slots: [Option<PortIndex>; PORT_COUNT],
    front: usize,
    /// One past the last free slot from the end; `PORT_COUNT` when the drive phase is empty.
    back: usize,
}

impl SwitchSequencer {
    pub const fn new() -> Self {
        Self {
            slots: [None; PORT_COUNT],
            front: 0,
            back: PORT_COUNT,
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_empty(&self) -> bool {
        self.front == 0 && self.back == PORT_COUNT
    }

    pub fn len(&self, phase: SwitchPhase) -> usize {
        match phase {
            SwitchPhase::MakeSafe => self.front,
            SwitchPhase::Drive => PORT_COUNT - self.back,
        }
    }

    /// Queue `port` for `phase`.  Returns `false` without queueing if the buffer is full.
    #[must_use]
    pub(crate) fn push(&mut self, phase: SwitchPhase, port: PortIndex) -> bool {
        if self.front >= self.back {
            return false;
        }
        match phase {
            SwitchPhase::MakeSafe => {
                self.slots[self.front] = Some(port);
                self.front += 1;
            }
            SwitchPhase::Drive => {
                self.back -= 1;
                self.slots[self.back] = Some(port);
            }
        }
        true
    }

    /// Take the next port of `phase`, or `None` once that phase is drained.
    pub(crate) fn pop(&mut self, phase: SwitchPhase) -> Option<PortIndex> {
        let slot = match phase {
            SwitchPhase::MakeSafe if self.front > 0 => {
                self.front -= 1;
                self.front
            }
            SwitchPhase::Drive if self.back < PORT_COUNT => {
                let slot = self.back;
                self.back += 1;
                slot
            }
            _ => return None,
        };
        self.slots[slot].take()
    }

    /// Queued ports of `phase` in the order they will be popped.
    pub fn pending(&self, phase: SwitchPhase) -> impl Iterator<Item = PortIndex> + '_ {
        let range = match phase {
            SwitchPhase::MakeSafe => &self.slots[..self.front],
            SwitchPhase::Drive => &self.slots[self.back..],
        };
        let reversed = phase == SwitchPhase::MakeSafe;
        let mut iter = range.iter().flatten();
        core::iter::from_fn(move || {
            if reversed {
                iter.next_back()
            } else {
                iter.next()
            }
        })
        .copied()
    }
}

impl Default for SwitchSequencer {
    fn default() -> Self {
        Self::new()
    }
}
