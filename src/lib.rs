//! Two-phase synchronization of host-supplied digital I/O configurations onto GPIO ports.
//!
//! A host sends one command byte per port describing mode, pull and output levels.  The
//! [`Engine`] turns a command into a candidate state, then commits it in two phases so that
//! every port which stops driving is reconfigured before any port starts driving.  The live
//! state is reported back as a four-byte [`Report`].
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod fmt;

mod bus;
mod command;
mod common;
pub mod dev;
mod engine;
mod error;
#[cfg(test)]
mod mock;
mod mutex;
mod report;
mod sequencer;
mod state;

pub use command::{decode_trigger, PortCommand, Trigger, TRIGGER_SENTINEL};
pub use common::{GpioBackend, Level, Mode, PinId, PinIndex, PinMap, PortIndex, Pull};
pub use common::{PINS_PER_PORT, PORT_COUNT};
pub use engine::{CommitSummary, Engine, EngineConfig};
pub use error::{Error, Phase};
pub use mutex::{EngineMutex, SharedEngine};
pub use report::{Report, REPORT_LEN};
pub use sequencer::{SwitchPhase, SwitchSequencer};
pub use state::{DigitalState, PortConfig, PortRuntime, Snapshot};

pub use dev::pcal6416a::Pcal6416a;
